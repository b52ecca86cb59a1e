//! Timestamp utilities
//!
//! Timestamps are persisted as RFC 3339 text.

use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a stored timestamp
pub fn from_db(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Bad timestamp '{}': {}", raw, e)))
}

/// Parse an optional stored timestamp
pub fn from_db_opt(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(from_db).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_db_format_preserves_instant() {
        let ts = now();
        let parsed = from_db(&to_db(ts)).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_from_db_rejects_garbage() {
        assert!(matches!(from_db("yesterday"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_from_db_opt_none() {
        assert_eq!(from_db_opt(None).unwrap(), None);
    }
}
