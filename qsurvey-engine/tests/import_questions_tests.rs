//! Tests for questions.csv import

mod helpers;

use helpers::{count, create_test_db, question_id, questions_csv, seed_likert_survey, QuestionSpec};
use qsurvey_engine::services::admin;
use qsurvey_engine::{import_questions, import_scales, IssueKind};
use sqlx::Row;

async fn snapshot(pool: &sqlx::SqlitePool, survey_id: i64) -> Vec<(i64, i32, String, String, bool, bool)> {
    sqlx::query(
        "SELECT question_id, display_order, question_text, question_type, is_reverse, is_required \
         FROM questions WHERE survey_id = ? ORDER BY display_order",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
    .unwrap()
    .iter()
    .map(|r| {
        (
            r.get("question_id"),
            r.get("display_order"),
            r.get("question_text"),
            r.get("question_type"),
            r.get("is_reverse"),
            r.get("is_required"),
        )
    })
    .collect()
}

fn three_questions(survey_id: i64) -> String {
    questions_csv(
        survey_id,
        &[
            QuestionSpec::single(1, "I sleep well"),
            QuestionSpec::single(2, "I feel rested").reversed(),
            QuestionSpec {
                order: 3,
                text: "Anything else?",
                question_type: "TEXT",
                reverse: false,
            },
        ],
    )
}

#[tokio::test]
async fn test_import_is_idempotent() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;
    let csv = three_questions(survey_id);

    let first = import_questions(&pool, survey_id, csv.as_bytes()).await.unwrap();
    assert!(first.is_success(), "{:?}", first.errors);
    assert_eq!(first.total_rows, 3);
    assert_eq!(first.success_rows, 3);
    let after_first = snapshot(&pool, survey_id).await;

    let second = import_questions(&pool, survey_id, csv.as_bytes()).await.unwrap();
    assert!(second.is_success());
    let after_second = snapshot(&pool, survey_id).await;

    assert_eq!(after_first, after_second);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM questions").await, 3);
}

#[tokio::test]
async fn test_natural_key_keeps_surrogate_id() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;
    import_questions(&pool, survey_id, three_questions(survey_id).as_bytes())
        .await
        .unwrap();
    let before = snapshot(&pool, survey_id).await;

    let edited = three_questions(survey_id).replace("Anything else?", "Any other comments?");
    let result = import_questions(&pool, survey_id, edited.as_bytes()).await.unwrap();
    assert!(result.is_success());
    let after = snapshot(&pool, survey_id).await;

    assert_eq!(after[2].0, before[2].0, "surrogate id changed");
    assert_eq!(after[2].1, 3);
    assert_eq!(after[2].2, "Any other comments?");
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[1]);
}

#[tokio::test]
async fn test_missing_header_is_structural_and_writes_nothing() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let csv = format!("surveyId,displayOrder,text,questionType\n{},1,Hello,TEXT\n", survey_id);
    let result = import_questions(&pool, survey_id, csv.as_bytes()).await.unwrap();

    assert_eq!(result.total_rows, 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, IssueKind::StructuralCsv);
    assert!(result.errors[0].message.contains("questionText"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM questions").await, 0);
}

#[tokio::test]
async fn test_validation_errors_abort_whole_file() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let csv = format!(
        "surveyId,displayOrder,questionText,questionType,isRequired\n\
         {id},1,Good row,TEXT,1\n\
         {id},2,Bad type,SLIDER,1\n\
         {id},1,Duplicate order,TEXT,1\n\
         {id},4,Bad flag,TEXT,maybe\n",
        id = survey_id
    );
    let result = import_questions(&pool, survey_id, csv.as_bytes()).await.unwrap();

    assert!(!result.is_success());
    assert_eq!(result.total_rows, 4);
    assert_eq!(result.success_rows, 0);
    assert_eq!(result.error_rows, 3);
    assert!(result.errors.iter().all(|e| e.kind == IssueKind::Validation));

    let messages = result.error_messages();
    assert!(messages.iter().any(|m| m.starts_with("row 3: [questionType] (Q2)")), "{:?}", messages);
    assert!(messages.iter().any(|m| m.starts_with("row 4: [displayOrder] (Q1)")), "{:?}", messages);
    assert!(messages.iter().any(|m| m.starts_with("row 5: [isRequired] (Q4)")), "{:?}", messages);

    // The good row was not written either
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM questions").await, 0);
}

#[tokio::test]
async fn test_survey_id_mismatch_rejected() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let csv = questions_csv(survey_id + 100, &[QuestionSpec::single(1, "Elsewhere")]);
    let result = import_questions(&pool, survey_id, csv.as_bytes()).await.unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].field.as_deref(), Some("surveyId"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM questions").await, 0);
}

#[tokio::test]
async fn test_bom_and_header_case_accepted() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let csv = format!(
        "\u{FEFF}SURVEY_ID,display_order,QuestionText,question_type\r\n{},1,\"Hello, world\",text\r\n",
        survey_id
    );
    let result = import_questions(&pool, survey_id, csv.as_bytes()).await.unwrap();
    assert!(result.is_success(), "{:?}", result.errors);

    let questions = admin::list_questions(&pool, survey_id).await.unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].question.question_text, "Hello, world");
    assert!(questions[0].question.is_required);
}

#[tokio::test]
async fn test_inline_scales_resolve_against_persisted_scales() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;
    import_scales(&pool, survey_id, b"scaleCode,scaleName\nANX,Anxiety\n")
        .await
        .unwrap();

    let unknown = format!(
        "surveyId,displayOrder,questionText,questionType,scales\n{},1,Worry,SINGLE_CHOICE,ANX:2|DEP\n",
        survey_id
    );
    let result = import_questions(&pool, survey_id, unknown.as_bytes()).await.unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, IssueKind::Referential);
    assert!(result.errors[0].message.contains("DEP"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM questions").await, 0);

    let known = format!(
        "surveyId,displayOrder,questionText,questionType,scales\n{},1,Worry,SINGLE_CHOICE,ANX:2\n",
        survey_id
    );
    let result = import_questions(&pool, survey_id, known.as_bytes()).await.unwrap();
    assert!(result.is_success(), "{:?}", result.errors);

    let (_, weights) = admin::list_scales(&pool, survey_id).await.unwrap();
    assert_eq!(weights.len(), 1);
    assert_eq!(weights[0].question_id, question_id(&pool, survey_id, 1).await);
    assert_eq!(weights[0].weight.to_string(), "2");
}

#[tokio::test]
async fn test_inline_weight_out_of_range_rejected() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;
    import_scales(&pool, survey_id, b"scaleCode,scaleName\nANX,Anxiety\n")
        .await
        .unwrap();

    let csv = format!(
        "surveyId,displayOrder,questionText,questionType,scales\n{},1,Worry,SINGLE_CHOICE,ANX:2000000\n",
        survey_id
    );
    let result = import_questions(&pool, survey_id, csv.as_bytes()).await.unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, IssueKind::Validation);
    assert_eq!(result.errors[0].field.as_deref(), Some("scales"));
    assert_eq!(result.errors[0].key.as_deref(), Some("Q1"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM questions").await, 0);
}

#[tokio::test]
async fn test_type_change_to_text_clears_options() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(
        &pool,
        &[QuestionSpec::single(1, "Mood"), QuestionSpec::single(2, "Sleep")],
    )
    .await;
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM question_options").await, 10);

    let csv = questions_csv(
        survey_id,
        &[QuestionSpec {
            order: 1,
            text: "Describe your mood",
            question_type: "TEXT",
            reverse: false,
        }],
    );
    let result = import_questions(&pool, survey_id, csv.as_bytes()).await.unwrap();
    assert!(result.is_success(), "{:?}", result.errors);

    let questions = admin::list_questions(&pool, survey_id).await.unwrap();
    assert!(questions[0].options.is_empty());
    assert_eq!(questions[1].options.len(), 5);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM question_options").await, 5);
}

#[tokio::test]
async fn test_unknown_survey_is_not_found() {
    let (_dir, pool) = create_test_db().await;
    let err = import_questions(&pool, 42, b"surveyId\n").await.unwrap_err();
    assert!(matches!(err, qsurvey_engine::EngineError::NotFound(_)));
}
