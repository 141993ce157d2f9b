//! Record persistence core with soft-delete fields and pattern properties.
//!
//! Record types declare typed properties; paranoid properties turn
//! "destroy" into a marker update hidden by default query scopes, while
//! "delete" still removes the row.

pub mod db;
pub mod logging;
pub mod model;
pub mod paranoid;
pub mod property;
pub mod repo;
pub mod scope;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{Record, RecordKey};
pub use model::record_type::{
    DefinitionError, HookError, HookResult, RecordType, RecordTypeBuilder,
};
pub use model::value::{Value, ValueKind};
pub use paranoid::{hard_remove, soft_remove, ParanoidBoolean, ParanoidMarker, ParanoidTimestamp};
pub use property::primitive::{Boolean, Integer, Serial, Text, Timestamp, UuidProperty};
pub use property::regexp::{dump_pattern, load_pattern, RegexpProperty};
pub use property::{PropertyError, PropertyType, StoredValue};
pub use repo::collection::RecordCollection;
pub use repo::record_repo::{
    RecordQuery, RecordRepository, RepoError, RepoResult, SqliteRecordRepository,
};
pub use scope::{with_all, Predicate, ScopeCondition};
pub use service::record_service::RecordService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
