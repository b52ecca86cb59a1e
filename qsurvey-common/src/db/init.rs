//! Database initialization
//!
//! Creates the database file on first run and brings the schema up to date.
//! Every statement is idempotent, so opening an existing database is safe.

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, config: &DatabaseConfig) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Foreign keys and busy timeout are per-connection settings, so they go
    // on the connect options rather than a one-off PRAGMA
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Definition tables
    create_surveys_table(pool).await?;
    create_questions_table(pool).await?;
    create_question_options_table(pool).await?;
    create_scales_table(pool).await?;
    create_scale_weights_table(pool).await?;

    // Response tables
    create_respondents_table(pool).await?;
    create_response_sessions_table(pool).await?;
    create_question_answers_table(pool).await?;
    create_answer_multi_selections_table(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_surveys_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS surveys (
            survey_id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            consent_text TEXT,
            status TEXT NOT NULL DEFAULT 'DRAFT' CHECK (status IN ('DRAFT', 'OPEN', 'CLOSED')),
            open_at TEXT,
            close_at TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the questions table
///
/// `(survey_id, display_order)` is the natural key used by every import.
async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            question_id INTEGER PRIMARY KEY AUTOINCREMENT,
            survey_id INTEGER NOT NULL REFERENCES surveys(survey_id) ON DELETE CASCADE,
            display_order INTEGER NOT NULL,
            question_text TEXT NOT NULL,
            question_type TEXT NOT NULL CHECK (question_type IN ('SINGLE_CHOICE', 'MULTI_CHOICE', 'TEXT', 'NUMBER')),
            question_role TEXT NOT NULL DEFAULT 'NORMAL' CHECK (question_role IN ('NORMAL', 'ATTENTION_CHECK', 'VALIDITY_CHECK')),
            is_reverse INTEGER NOT NULL DEFAULT 0,
            is_required INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (survey_id, display_order),
            CHECK (display_order >= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_question_options_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS question_options (
            option_id INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id INTEGER NOT NULL REFERENCES questions(question_id) ON DELETE CASCADE,
            display_order INTEGER NOT NULL,
            option_text TEXT NOT NULL,
            score INTEGER,
            is_correct INTEGER NOT NULL DEFAULT 0,
            UNIQUE (question_id, display_order)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_scales_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scales (
            scale_id INTEGER PRIMARY KEY AUTOINCREMENT,
            survey_id INTEGER NOT NULL REFERENCES surveys(survey_id) ON DELETE CASCADE,
            scale_code TEXT NOT NULL,
            scale_name TEXT NOT NULL,
            description TEXT,
            UNIQUE (survey_id, scale_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the scale_weights linking table
///
/// Weight is canonical decimal text to keep the value exact.
async fn create_scale_weights_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scale_weights (
            scale_id INTEGER NOT NULL REFERENCES scales(scale_id) ON DELETE CASCADE,
            question_id INTEGER NOT NULL REFERENCES questions(question_id) ON DELETE CASCADE,
            weight TEXT NOT NULL DEFAULT '1',
            PRIMARY KEY (scale_id, question_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scale_weights_question ON scale_weights(question_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_respondents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS respondents (
            respondent_id INTEGER PRIMARY KEY AUTOINCREMENT,
            survey_id INTEGER NOT NULL REFERENCES surveys(survey_id) ON DELETE CASCADE,
            respondent_key TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (survey_id, respondent_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_response_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS response_sessions (
            response_id INTEGER PRIMARY KEY AUTOINCREMENT,
            respondent_id INTEGER NOT NULL REFERENCES respondents(respondent_id) ON DELETE CASCADE,
            status TEXT NOT NULL CHECK (status IN ('IN_PROGRESS', 'COMPLETED')),
            started_at TEXT NOT NULL,
            completed_at TEXT,
            CHECK (status = 'IN_PROGRESS' OR completed_at IS NOT NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_response_sessions_respondent ON response_sessions(respondent_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_response_sessions_status ON response_sessions(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the question_answers table
///
/// Exactly one row per (response, question). The payload columns are mutually
/// exclusive; MULTI answers keep their selections in answer_multi_selections.
async fn create_question_answers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS question_answers (
            answer_id INTEGER PRIMARY KEY AUTOINCREMENT,
            response_id INTEGER NOT NULL REFERENCES response_sessions(response_id) ON DELETE CASCADE,
            question_id INTEGER NOT NULL REFERENCES questions(question_id) ON DELETE CASCADE,
            option_id INTEGER REFERENCES question_options(option_id),
            answer_number REAL,
            answer_text TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (response_id, question_id),
            CHECK (option_id IS NULL OR (answer_number IS NULL AND answer_text IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_question_answers_question ON question_answers(question_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_answer_multi_selections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answer_multi_selections (
            answer_id INTEGER NOT NULL REFERENCES question_answers(answer_id) ON DELETE CASCADE,
            option_id INTEGER NOT NULL REFERENCES question_options(option_id),
            PRIMARY KEY (answer_id, option_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_answer_multi_option ON answer_multi_selections(option_id)")
        .execute(pool)
        .await?;

    Ok(())
}
