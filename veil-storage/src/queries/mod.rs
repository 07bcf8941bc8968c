//! Plain functions over a borrowed `Connection`, one file per table group.

pub mod chunks;
pub mod messages;
pub mod violations;

use chrono::{DateTime, Utc};
use veil_core::errors::{StorageError, VeilResult};

pub(crate) fn parse_timestamp(raw: &str) -> VeilResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StorageError::DecodeFailed {
                reason: format!("bad timestamp '{raw}': {e}"),
            }
            .into()
        })
}
