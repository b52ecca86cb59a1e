//! Tests for scales.csv and scale_weights.csv import

mod helpers;

use helpers::{count, create_test_db, question_id, respond_single, seed_likert_survey, QuestionSpec};
use qsurvey_engine::services::admin;
use qsurvey_engine::{import_scale_weights, import_scales, scale_statistics, IssueKind};
use rust_decimal::Decimal;
use std::str::FromStr;

#[tokio::test]
async fn test_scales_upsert_by_code() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let first = import_scales(
        &pool,
        survey_id,
        b"scaleCode,scaleName,description\nANX,Anxiety,\nDEP,Depression,Mood items\n",
    )
    .await
    .unwrap();
    assert!(first.is_success());
    let (before, _) = admin::list_scales(&pool, survey_id).await.unwrap();

    let second = import_scales(&pool, survey_id, b"scale_code,scale_name\nANX,Anxiety (GAD)\n")
        .await
        .unwrap();
    assert!(second.is_success());
    let (after, _) = admin::list_scales(&pool, survey_id).await.unwrap();

    assert_eq!(after.len(), 2);
    assert_eq!(after[0].scale_id, before[0].scale_id);
    assert_eq!(after[0].scale_name, "Anxiety (GAD)");
    assert_eq!(after[0].description, None);
    assert_eq!(after[1], before[1]);
}

#[tokio::test]
async fn test_duplicate_scale_code_aborts() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let result = import_scales(&pool, survey_id, b"scaleCode,scaleName\nANX,A\nANX,B\n")
        .await
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row, Some(3));
    assert_eq!(result.errors[0].key.as_deref(), Some("ANX"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM scales").await, 0);
}

#[tokio::test]
async fn test_weights_replace_whole_survey_set() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(
        &pool,
        &[QuestionSpec::single(1, "One"), QuestionSpec::single(2, "Two"), QuestionSpec::single(3, "Three")],
    )
    .await;
    import_scales(&pool, survey_id, b"scaleCode,scaleName\nANX,Anxiety\nDEP,Depression\n")
        .await
        .unwrap();

    let first = import_scale_weights(
        &pool,
        survey_id,
        b"scaleCode,questionOrder,weight\nANX,1,1.5\nANX,2,\nDEP,3,2\n",
    )
    .await
    .unwrap();
    assert!(first.is_success(), "{:?}", first.errors);
    let (_, weights) = admin::list_scales(&pool, survey_id).await.unwrap();
    assert_eq!(weights.len(), 3);
    assert_eq!(weights[0].weight, Decimal::from_str("1.5").unwrap());
    assert_eq!(weights[1].weight, Decimal::ONE);

    // questionDisplayOrder alias, and a smaller set
    let second = import_scale_weights(&pool, survey_id, b"scaleCode,questionDisplayOrder\nDEP,1\n")
        .await
        .unwrap();
    assert!(second.is_success(), "{:?}", second.errors);

    let (_, weights) = admin::list_scales(&pool, survey_id).await.unwrap();
    assert_eq!(weights.len(), 1);
    assert_eq!(weights[0].question_id, question_id(&pool, survey_id, 1).await);
}

#[tokio::test]
async fn test_weight_references_checked() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[QuestionSpec::single(1, "One")]).await;
    import_scales(&pool, survey_id, b"scaleCode,scaleName\nANX,Anxiety\n")
        .await
        .unwrap();
    import_scale_weights(&pool, survey_id, b"scaleCode,questionOrder\nANX,1\n")
        .await
        .unwrap();

    let result = import_scale_weights(
        &pool,
        survey_id,
        b"scaleCode,questionOrder\nANX,1\nXYZ,1\nANX,7\n",
    )
    .await
    .unwrap();

    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.kind == IssueKind::Referential));
    assert_eq!(result.errors[0].key.as_deref(), Some("XYZ/Q1"));
    assert_eq!(result.errors[1].key.as_deref(), Some("ANX/Q7"));

    // Previous set untouched
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM scale_weights").await, 1);
}

#[tokio::test]
async fn test_bad_weight_is_validation() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[QuestionSpec::single(1, "One")]).await;
    import_scales(&pool, survey_id, b"scaleCode,scaleName\nANX,Anxiety\n")
        .await
        .unwrap();

    let result = import_scale_weights(&pool, survey_id, b"scaleCode,questionOrder,weight\nANX,1,heavy\n")
        .await
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, IssueKind::Validation);
    assert_eq!(result.errors[0].field.as_deref(), Some("weight"));
}

#[tokio::test]
async fn test_out_of_range_weight_rejected_and_scoring_survives() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[QuestionSpec::single(1, "One")]).await;
    import_scales(&pool, survey_id, b"scaleCode,scaleName\nX,Extreme\n")
        .await
        .unwrap();

    let result = import_scale_weights(
        &pool,
        survey_id,
        b"scaleCode,questionOrder,weight\nX,1,79228162514264337593543950335\nX,1,-1\n",
    )
    .await
    .unwrap();

    assert_eq!(result.success_rows, 0);
    let weight_issues: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.field.as_deref() == Some("weight"))
        .collect();
    assert_eq!(weight_issues.len(), 2);
    assert_eq!(weight_issues[0].kind, IssueKind::Validation);
    assert_eq!(weight_issues[0].row, Some(2));
    assert_eq!(weight_issues[0].key.as_deref(), Some("X/Q1"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM scale_weights").await, 0);

    // The largest accepted weight still scores
    let result = import_scale_weights(&pool, survey_id, b"scaleCode,questionOrder,weight\nX,1,1000000\n")
        .await
        .unwrap();
    assert!(result.is_success(), "{:?}", result.errors);
    respond_single(&pool, survey_id, &[(1, 4)]).await;

    let stats = scale_statistics(&pool, survey_id).await.unwrap();
    assert_eq!(stats[0].count, 1);
    assert_eq!(stats[0].mean, Some(4.0));
}

#[tokio::test]
async fn test_missing_columns_reported_together() {
    let (_dir, pool) = create_test_db().await;
    let survey_id = seed_likert_survey(&pool, &[]).await;

    let result = import_scale_weights(&pool, survey_id, b"code,order\nANX,1\n").await.unwrap();

    assert_eq!(result.total_rows, 0);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.kind == IssueKind::StructuralCsv));
}
