//! CSV fixtures and seeded surveys

use super::db_utils::{option_id, question_id};
use qsurvey_engine::models::NewSurvey;
use qsurvey_engine::services::admin;
use qsurvey_engine::{import_options, import_questions, start_response, submit, SubmittedAnswer};
use sqlx::SqlitePool;

/// One questions.csv row
pub struct QuestionSpec {
    pub order: i32,
    pub text: &'static str,
    pub question_type: &'static str,
    pub reverse: bool,
}

impl QuestionSpec {
    pub fn single(order: i32, text: &'static str) -> Self {
        Self {
            order,
            text,
            question_type: "SINGLE_CHOICE",
            reverse: false,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }
}

pub fn questions_csv(survey_id: i64, questions: &[QuestionSpec]) -> String {
    let mut csv = String::from("surveyId,displayOrder,questionText,questionType,isReverse\n");
    for q in questions {
        csv.push_str(&format!(
            "{},{},\"{}\",{},{}\n",
            survey_id,
            q.order,
            q.text,
            q.question_type,
            if q.reverse { 1 } else { 0 }
        ));
    }
    csv
}

/// Five options scored 1..5 for each listed question
pub fn likert_options_csv(survey_id: i64, question_orders: &[i32]) -> String {
    let labels = ["Never", "Rarely", "Sometimes", "Often", "Always"];
    let mut csv = String::from("surveyId,questionDisplayOrder,displayOrder,optionText,score\n");
    for order in question_orders {
        for (i, label) in labels.iter().enumerate() {
            csv.push_str(&format!("{},{},{},{},{}\n", survey_id, order, i + 1, label, i + 1));
        }
    }
    csv
}

/// Survey with `questions` SINGLE_CHOICE items, each with five options
/// scored 1..5 (option display order == score)
pub async fn seed_likert_survey(pool: &SqlitePool, questions: &[QuestionSpec]) -> i64 {
    let survey = admin::create_survey(
        pool,
        &NewSurvey {
            title: "Wellbeing".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let survey_id = survey.survey_id;

    let result = import_questions(pool, survey_id, questions_csv(survey_id, questions).as_bytes())
        .await
        .unwrap();
    assert!(result.is_success(), "{:?}", result.errors);

    let orders: Vec<i32> = questions.iter().map(|q| q.order).collect();
    let result = import_options(pool, survey_id, likert_options_csv(survey_id, &orders).as_bytes())
        .await
        .unwrap();
    assert!(result.is_success(), "{:?}", result.errors);

    survey_id
}

/// Start and submit a response choosing `(question order, option order)` pairs
pub async fn respond_single(pool: &SqlitePool, survey_id: i64, choices: &[(i32, i32)]) -> i64 {
    let start = start_response(pool, survey_id, None).await.unwrap();

    let mut answers = Vec::new();
    for (question_order, option_order) in choices {
        answers.push(SubmittedAnswer::single(
            question_id(pool, survey_id, *question_order).await,
            option_id(pool, survey_id, *question_order, *option_order).await,
        ));
    }

    submit(pool, start.response_id, survey_id, &start.consent_token, &answers)
        .await
        .unwrap();
    start.response_id
}
