//! # qsurvey Common Library
//!
//! Shared code for the questionnaire engine and its front ends:
//! - Database initialization and schema
//! - Domain models and closed enums for questions, sessions and answers
//! - Configuration loading and root folder resolution
//! - Minimal quoted-CSV reader used by every importer

pub mod config;
pub mod csv;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
