//! Database access for qsurvey-engine
//!
//! Functions take `&mut SqliteConnection` so the same code runs against a
//! pooled connection or inside an open transaction.

pub mod answers;
pub mod options;
pub mod questions;
pub mod responses;
pub mod scales;
pub mod stats;
pub mod surveys;

use crate::error::EngineResult;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

/// Decode a closed-enum TEXT column
pub(crate) fn enum_column<T>(row: &SqliteRow, column: &str) -> EngineResult<T>
where
    T: FromStr<Err = qsurvey_common::Error>,
{
    let raw: String = row.get(column);
    Ok(raw.parse::<T>()?)
}
