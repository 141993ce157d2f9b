//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `recordkit_core` linkage.
//! - Walk one record through soft and hard removal on an in-memory database.

use recordkit_core::db::open_db_in_memory;
use recordkit_core::{
    ParanoidBoolean, RecordService, RecordType, RecordTypeBuilder, RepoError, Serial,
    SqliteRecordRepository,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("recordkit_core ping={}", recordkit_core::ping());
    println!("recordkit_core version={}", recordkit_core::core_version());

    match run_smoke() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("recordkit smoke failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_smoke() -> Result<(), Box<dyn std::error::Error>> {
    let draft = RecordTypeBuilder::new("Draft")
        .storage_name("articles")
        .property("id", Serial)
        .property("deleted", ParanoidBoolean)
        .timestamps()
        .build()?;
    let article = RecordType::derive(&draft, "Article").build()?;

    let conn = open_db_in_memory()?;
    let service = RecordService::new(SqliteRecordRepository::try_new(&conn, &[&article])?);

    let mut soft = service.create(&article)?;
    let mut hard = service.create(&article)?;
    service.soft_remove(&mut soft)?;
    service.hard_remove(&mut hard)?;

    let visible = service.count(&article)?;
    let stored = service.all_with_deleted(&article).len()?;
    println!("articles visible={visible} stored={stored}");

    if visible != 0 || stored != 1 {
        return Err(Box::new(RepoError::InvalidData(format!(
            "unexpected counts visible={visible} stored={stored}"
        ))));
    }
    Ok(())
}
