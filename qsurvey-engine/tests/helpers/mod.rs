//! Test Helper Utilities
//!
//! Shared utilities for testing qsurvey-engine

#![allow(dead_code)]

pub mod db_utils;
pub mod fixtures;

pub use db_utils::{count, create_test_db, option_id, question_id};
pub use fixtures::{
    likert_options_csv, questions_csv, respond_single, seed_likert_survey, QuestionSpec,
};
