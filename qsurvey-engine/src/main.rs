//! qsurvey - questionnaire engine command line
//!
//! Every command prints its result as JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use qsurvey_common::config::{self, TomlConfig};
use qsurvey_common::db::{init::init_database, SurveyStatus};
use qsurvey_engine::models::{NewQuestion, NewSurvey, PublishSettings};
use qsurvey_engine::services::{admin, authoring, availability, import, recorder, scoring};
use qsurvey_engine::{ConsentToken, ImportResult, SubmittedAnswer};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for qsurvey
#[derive(Parser, Debug)]
#[command(name = "qsurvey")]
#[command(about = "Questionnaire definition import, response recording and scoring")]
#[command(version)]
struct Cli {
    /// Root folder holding the database
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: platform config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database if missing and bring the schema up to date
    Init,

    /// Survey administration
    #[command(subcommand)]
    Survey(SurveyCommand),

    /// Append a question described by a JSON file
    AddQuestion {
        #[arg(long)]
        survey: i64,
        file: PathBuf,
    },

    /// Import a CSV file into a survey
    Import {
        #[command(subcommand)]
        kind: ImportKind,
    },

    /// Start or submit a response
    #[command(subcommand)]
    Respond(RespondCommand),

    /// Aggregates over completed responses
    Stats {
        #[command(subcommand)]
        kind: StatsKind,
    },

    /// List response sessions of a survey
    Responses {
        #[arg(long)]
        survey: i64,

        /// Only COMPLETED sessions
        #[arg(long)]
        completed_only: bool,
    },

    /// Answer lines of one response
    Response { response: i64 },
}

#[derive(Subcommand, Debug)]
enum SurveyCommand {
    /// Create a DRAFT survey
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        consent_text: Option<String>,
    },
    /// List surveys, newest first
    List,
    /// Show a survey with its questions and scales
    Show { survey: i64 },
    /// Whether the survey accepts responses now
    Availability { survey: i64 },
    /// Set status and publication window
    Publish {
        survey: i64,
        #[arg(long, value_parser = parse_status)]
        status: SurveyStatus,
        /// RFC 3339 timestamp
        #[arg(long, value_parser = parse_timestamp)]
        open_at: Option<DateTime<Utc>>,
        /// RFC 3339 timestamp
        #[arg(long, value_parser = parse_timestamp)]
        close_at: Option<DateTime<Utc>>,
    },
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[arg(long)]
    survey: i64,
    file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum ImportKind {
    Questions(ImportArgs),
    Options(ImportArgs),
    Scales(ImportArgs),
    ScaleWeights(ImportArgs),
    /// Best-effort: each row is committed on its own
    Answers(ImportArgs),
}

#[derive(Subcommand, Debug)]
enum RespondCommand {
    /// Open a response session
    Start {
        #[arg(long)]
        survey: i64,
        #[arg(long)]
        key: Option<String>,
    },
    /// Submit answers from a JSON file (array of answers)
    Submit {
        #[arg(long)]
        survey: i64,
        #[arg(long)]
        response: i64,
        #[arg(long)]
        token: String,
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[arg(long)]
    survey: i64,
}

#[derive(Subcommand, Debug)]
enum StatsKind {
    Questions(StatsArgs),
    Options(StatsArgs),
    Averages(StatsArgs),
    Scales(StatsArgs),
}

#[derive(Serialize)]
struct SurveyDetail {
    survey: qsurvey_common::db::Survey,
    questions: Vec<qsurvey_engine::models::QuestionSnapshot>,
    scales: Vec<qsurvey_common::db::Scale>,
    weights: Vec<qsurvey_common::db::ScaleWeight>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = match &cli.config {
        Some(path) => TomlConfig::load_from(path)?,
        None => TomlConfig::load_default()?,
    };

    // Initialize tracing (RUST_LOG wins over the config file)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let root_folder = config::resolve_root_folder(cli.root_folder.as_deref(), &toml_config);
    let db_path = config::resolve_database_path(&root_folder, &toml_config);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path, &toml_config.database)
        .await
        .context("Failed to open database")?;

    run(&pool, cli.command).await
}

async fn run(pool: &SqlitePool, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            print_json(&serde_json::json!({ "status": "ok" }))?;
        }
        Command::Survey(cmd) => run_survey(pool, cmd).await?,
        Command::AddQuestion { survey, file } => {
            let input: NewQuestion = read_json(&file)?;
            print_json(&authoring::create_question(pool, survey, &input).await?)?;
        }
        Command::Import { kind } => {
            let result = match kind {
                ImportKind::Questions(a) => import::import_questions(pool, a.survey, &read_bytes(&a.file)?).await?,
                ImportKind::Options(a) => import::import_options(pool, a.survey, &read_bytes(&a.file)?).await?,
                ImportKind::Scales(a) => import::import_scales(pool, a.survey, &read_bytes(&a.file)?).await?,
                ImportKind::ScaleWeights(a) => {
                    import::import_scale_weights(pool, a.survey, &read_bytes(&a.file)?).await?
                }
                ImportKind::Answers(a) => import::import_answers(pool, a.survey, &read_bytes(&a.file)?).await?,
            };
            report_import(&result)?;
        }
        Command::Respond(RespondCommand::Start { survey, key }) => {
            print_json(&recorder::start_response(pool, survey, key.as_deref()).await?)?;
        }
        Command::Respond(RespondCommand::Submit {
            survey,
            response,
            token,
            file,
        }) => {
            let answers: Vec<SubmittedAnswer> = read_json(&file)?;
            recorder::submit(pool, response, survey, &ConsentToken::from_string(token), &answers).await?;
            print_json(&serde_json::json!({ "response_id": response, "status": "COMPLETED" }))?;
        }
        Command::Stats { kind } => match kind {
            StatsKind::Questions(a) => print_json(&scoring::question_counts(pool, a.survey).await?)?,
            StatsKind::Options(a) => print_json(&scoring::option_counts(pool, a.survey).await?)?,
            StatsKind::Averages(a) => print_json(&scoring::average_scores(pool, a.survey).await?)?,
            StatsKind::Scales(a) => print_json(&scoring::scale_statistics(pool, a.survey).await?)?,
        },
        Command::Responses {
            survey,
            completed_only,
        } => {
            print_json(&admin::list_responses(pool, survey, completed_only).await?)?;
        }
        Command::Response { response } => {
            print_json(&admin::response_detail(pool, response).await?)?;
        }
    }
    Ok(())
}

async fn run_survey(pool: &SqlitePool, cmd: SurveyCommand) -> Result<()> {
    match cmd {
        SurveyCommand::Create {
            title,
            description,
            consent_text,
        } => {
            let input = NewSurvey {
                title,
                description,
                consent_text,
            };
            print_json(&admin::create_survey(pool, &input).await?)
        }
        SurveyCommand::List => print_json(&admin::list_surveys(pool).await?),
        SurveyCommand::Show { survey } => {
            let (scales, weights) = admin::list_scales(pool, survey).await?;
            print_json(&SurveyDetail {
                survey: admin::get_survey(pool, survey).await?,
                questions: admin::list_questions(pool, survey).await?,
                scales,
                weights,
            })
        }
        SurveyCommand::Availability { survey } => {
            print_json(&serde_json::json!({
                "survey_id": survey,
                "availability": availability::check(pool, survey).await?,
            }))
        }
        SurveyCommand::Publish {
            survey,
            status,
            open_at,
            close_at,
        } => {
            let settings = PublishSettings {
                status,
                open_at,
                close_at,
            };
            print_json(&admin::update_publish_settings(pool, survey, &settings).await?)
        }
    }
}

/// Print the report; a report with problems ends the process with an error
fn report_import(result: &ImportResult) -> Result<()> {
    print_json(result)?;
    if !result.is_success() {
        bail!(
            "import finished with {} problem(s): {} of {} rows written",
            result.errors.len(),
            result.success_rows,
            result.total_rows
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn parse_status(raw: &str) -> std::result::Result<SurveyStatus, String> {
    raw.parse().map_err(|e: qsurvey_common::Error| e.to_string())
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    qsurvey_common::time::from_db(raw).map_err(|e| e.to_string())
}
