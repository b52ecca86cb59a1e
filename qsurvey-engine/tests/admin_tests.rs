//! Survey administration and ad-hoc authoring

mod helpers;

use chrono::{Duration, Utc};
use helpers::{create_test_db, option_id, question_id, respond_single, seed_likert_survey, QuestionSpec};
use qsurvey_common::db::{QuestionRole, QuestionType, SurveyStatus};
use qsurvey_engine::models::{NewOption, NewQuestion, NewSurvey, OptionTemplate, PublishSettings};
use qsurvey_engine::services::{admin, authoring};
use qsurvey_engine::{import_questions, start_response, submit, EngineError, SubmittedAnswer};

fn option(text: &str, score: Option<i32>) -> NewOption {
    NewOption {
        option_text: text.to_string(),
        score,
        is_correct: false,
    }
}

fn new_question(question_type: QuestionType, template: OptionTemplate, options: Vec<NewOption>) -> NewQuestion {
    NewQuestion {
        question_text: "  How are you?  ".to_string(),
        question_type,
        question_role: QuestionRole::Normal,
        is_reverse: false,
        is_required: true,
        template,
        options,
    }
}

#[tokio::test]
async fn test_create_and_list_surveys() {
    let (_dir, pool) = create_test_db().await;

    let first = admin::create_survey(
        &pool,
        &NewSurvey {
            title: " First ".to_string(),
            description: Some("  ".to_string()),
            consent_text: Some("I agree".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(first.title, "First");
    assert_eq!(first.status, SurveyStatus::Draft);
    assert_eq!(first.description, None);
    assert_eq!(first.consent_text.as_deref(), Some("I agree"));

    let second = seed_likert_survey(&pool, &[QuestionSpec::single(1, "Q")]).await;
    respond_single(&pool, second, &[(1, 1)]).await;

    let listed = admin::list_surveys(&pool).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].survey.survey_id, second);
    assert_eq!(listed[0].completed_count, 1);
    assert_eq!(listed[1].completed_count, 0);
}

#[tokio::test]
async fn test_blank_title_rejected() {
    let (_dir, pool) = create_test_db().await;
    let err = admin::create_survey(&pool, &NewSurvey::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn test_publish_window_validated() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;
    let open_at = Utc::now();

    let bad = PublishSettings {
        status: SurveyStatus::Open,
        open_at: Some(open_at),
        close_at: Some(open_at),
    };
    let err = admin::update_publish_settings(&pool, survey_id, &bad).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let good = PublishSettings {
        status: SurveyStatus::Open,
        open_at: Some(open_at),
        close_at: Some(open_at + Duration::days(7)),
    };
    let survey = admin::update_publish_settings(&pool, survey_id, &good).await.unwrap();
    assert_eq!(survey.status, SurveyStatus::Open);
    assert_eq!(survey.open_at, Some(open_at));

    let missing = admin::update_publish_settings(&pool, survey_id + 1, &good).await.unwrap_err();
    assert!(matches!(missing, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_authoring_appends_with_next_order() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(
        &pool,
        &[QuestionSpec::single(1, "A"), QuestionSpec::single(4, "B")],
    )
    .await;

    let created = authoring::create_question(
        &pool,
        survey_id,
        &new_question(
            QuestionType::SingleChoice,
            OptionTemplate::Likert5,
            vec![option("Bad", None), option("", None), option("Fine", None), option("Great", None)],
        ),
    )
    .await
    .unwrap();

    assert_eq!(created.question.display_order, 5);
    assert_eq!(created.question.question_text, "How are you?");
    let scores: Vec<Option<i32>> = created.options.iter().map(|o| o.score).collect();
    assert_eq!(scores, vec![Some(1), Some(2), Some(3)]);
}

#[tokio::test]
async fn test_authoring_text_question_stores_no_options() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let created = authoring::create_question(
        &pool,
        survey_id,
        &new_question(QuestionType::Text, OptionTemplate::Likert5, vec![option("ignored", None)]),
    )
    .await
    .unwrap();

    assert_eq!(created.question.display_order, 1);
    assert!(created.options.is_empty());
}

#[tokio::test]
async fn test_authoring_needs_two_options() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let err = authoring::create_question(
        &pool,
        survey_id,
        &new_question(QuestionType::MultiChoice, OptionTemplate::Custom, vec![option("Only", Some(1))]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(admin::list_questions(&pool, survey_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_response_detail_lists_one_line_per_selection() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(
        &pool,
        &[QuestionSpec::single(1, "Mood"), QuestionSpec {
            order: 2,
            text: "Hobbies",
            question_type: "MULTI_CHOICE",
            reverse: false,
        }],
    )
    .await;
    let extra = format!(
        "surveyId,displayOrder,questionText,questionType\n{id},3,Comments,TEXT\n{id},4,Age,NUMBER\n",
        id = survey_id
    );
    assert!(import_questions(&pool, survey_id, extra.as_bytes()).await.unwrap().is_success());

    let start = start_response(&pool, survey_id, None).await.unwrap();
    let answers = vec![
        SubmittedAnswer::number(question_id(&pool, survey_id, 4).await, "42"),
        SubmittedAnswer::multi(
            question_id(&pool, survey_id, 2).await,
            vec![option_id(&pool, survey_id, 2, 3).await, option_id(&pool, survey_id, 2, 1).await],
        ),
        SubmittedAnswer::single(question_id(&pool, survey_id, 1).await, option_id(&pool, survey_id, 1, 2).await),
        SubmittedAnswer::text(question_id(&pool, survey_id, 3).await, "fine"),
    ];
    submit(&pool, start.response_id, survey_id, &start.consent_token, &answers)
        .await
        .unwrap();

    let lines = admin::response_detail(&pool, start.response_id).await.unwrap();

    let orders: Vec<i32> = lines.iter().map(|l| l.question_order).collect();
    assert_eq!(orders, vec![1, 2, 2, 3, 4]);
    assert!(lines.iter().all(|l| l.response_id == start.response_id));

    assert_eq!(lines[0].question_type, QuestionType::SingleChoice);
    assert_eq!(lines[0].option_text.as_deref(), Some("Rarely"));

    assert_eq!(lines[1].answer_id, lines[2].answer_id);
    assert_eq!(lines[1].option_id, Some(option_id(&pool, survey_id, 2, 1).await));
    assert_eq!(lines[1].option_text.as_deref(), Some("Never"));
    assert_eq!(lines[2].option_text.as_deref(), Some("Sometimes"));
    assert_eq!(lines[2].answer_text, None);

    assert_eq!(lines[3].option_id, None);
    assert_eq!(lines[3].answer_text.as_deref(), Some("fine"));
    assert_eq!(lines[4].answer_text.as_deref(), Some("42"));
    assert_eq!(lines[4].answer_number, Some(42.0));
}

#[tokio::test]
async fn test_response_detail_unknown_response() {
    let (_dir, pool) = create_test_db().await;
    let err = admin::response_detail(&pool, 99).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_response_detail_in_progress_is_empty() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[QuestionSpec::single(1, "Q")]).await;
    let start = start_response(&pool, survey_id, None).await.unwrap();

    assert!(admin::response_detail(&pool, start.response_id).await.unwrap().is_empty());
}
