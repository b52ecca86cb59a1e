//! Database Test Utilities

use qsurvey_common::config::DatabaseConfig;
use qsurvey_common::db::init::init_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create temporary test database with the schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_qsurvey.db");
    let pool = init_database(&db_path, &DatabaseConfig::default())
        .await
        .unwrap();
    (temp_dir, pool)
}

/// Run a `SELECT COUNT(*)`-style query
pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

/// Surrogate id of a question by display order
pub async fn question_id(pool: &SqlitePool, survey_id: i64, display_order: i32) -> i64 {
    sqlx::query_scalar("SELECT question_id FROM questions WHERE survey_id = ? AND display_order = ?")
        .bind(survey_id)
        .bind(display_order)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Surrogate id of an option by question and option display order
pub async fn option_id(pool: &SqlitePool, survey_id: i64, question_order: i32, option_order: i32) -> i64 {
    sqlx::query_scalar(
        r#"
        SELECT o.option_id
        FROM question_options o
        JOIN questions q ON q.question_id = o.question_id
        WHERE q.survey_id = ? AND q.display_order = ? AND o.display_order = ?
        "#,
    )
    .bind(survey_id)
    .bind(question_order)
    .bind(option_order)
    .fetch_one(pool)
    .await
    .unwrap()
}
