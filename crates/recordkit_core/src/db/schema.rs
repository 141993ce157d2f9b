//! Table creation and upgrade for record types.
//!
//! # Responsibility
//! - Create the table backing a record type when it is missing.
//! - Add columns for properties the existing table does not have yet.
//!
//! # Invariants
//! - Only validated identifiers reach SQL text.
//! - Existing columns are never altered or dropped.
//! - Create and upgrade statements for one type run in one transaction.

use crate::db::{DbError, DbResult};
use crate::model::record_type::RecordType;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::collections::BTreeSet;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Whether `name` can be used as a table or column name.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Double-quotes an identifier for SQL text.
///
/// Callers pass names validated by `is_valid_identifier`.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

/// Creates or upgrades the table for `record_type`.
///
/// Returns the names of columns added to a pre-existing table.
pub fn auto_migrate(conn: &Connection, record_type: &RecordType) -> DbResult<Vec<String>> {
    let table = record_type.storage_name();
    for name in std::iter::once(table).chain(record_type.properties().iter().map(|def| def.name())) {
        if !is_valid_identifier(name) {
            return Err(DbError::InvalidIdentifier(name.to_string()));
        }
    }

    match migrate_table(conn, record_type) {
        Ok(added) => {
            info!(
                "event=schema_migrate module=db status=ok type={} table={} added_columns={}",
                record_type.name(),
                table,
                added.len()
            );
            Ok(added)
        }
        Err(err) => {
            error!(
                "event=schema_migrate module=db status=error type={} table={} error={}",
                record_type.name(),
                table,
                err
            );
            Err(err)
        }
    }
}

fn migrate_table(conn: &Connection, record_type: &RecordType) -> DbResult<Vec<String>> {
    let table = quote_identifier(record_type.storage_name());
    let existing = existing_columns(conn, record_type.storage_name())?;

    let tx = conn.unchecked_transaction()?;
    let mut added = Vec::new();

    if existing.is_empty() {
        let columns: Vec<String> = record_type
            .properties()
            .iter()
            .map(|def| {
                format!(
                    "{} {}",
                    quote_identifier(def.name()),
                    def.property().column_definition()
                )
            })
            .collect();
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} ({});",
            columns.join(", ")
        ))?;
    } else {
        for def in record_type.properties() {
            if existing.contains(def.name()) {
                continue;
            }
            tx.execute_batch(&format!(
                "ALTER TABLE {table} ADD COLUMN {} {};",
                quote_identifier(def.name()),
                def.property().column_definition()
            ))?;
            added.push(def.name().to_string());
        }
    }

    tx.commit()?;
    Ok(added)
}

fn existing_columns(conn: &Connection, table: &str) -> DbResult<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::{is_valid_identifier, quote_identifier};

    #[test]
    fn identifier_validation() {
        assert!(is_valid_identifier("articles"));
        assert!(is_valid_identifier("_deleted_at2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("drop table"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn quoting_wraps_in_double_quotes() {
        assert_eq!(quote_identifier("deleted"), "\"deleted\"");
    }
}
