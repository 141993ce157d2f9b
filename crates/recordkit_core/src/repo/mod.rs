//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence contract consumed by removal operations.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Reads apply the record type's default scope unless relaxed.
//! - Repository APIs distinguish "no row matched" from transport errors.

pub mod collection;
pub mod record_repo;
