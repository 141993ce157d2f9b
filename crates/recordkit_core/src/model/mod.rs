//! Record model shared by the property, repository and service layers.
//!
//! # Responsibility
//! - Define native field values and their kinds.
//! - Define record type descriptors and record instances.
//!
//! # Invariants
//! - A `RecordType` is immutable once built; derived types own a copy of
//!   the parent's configuration.
//! - A `Record` only holds values for properties declared on its type.

pub mod record;
pub mod record_type;
pub mod value;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock as unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(0)
}
