use recordkit_core::db::open_db_in_memory;
use recordkit_core::{
    Integer, ParanoidBoolean, Record, RecordQuery, RecordRepository, RecordService,
    RecordTypeBuilder, RegexpProperty, Serial, SqliteRecordRepository, Text, UuidProperty, Value,
};
use regex::Regex;
use uuid::Uuid;

#[test]
fn record_serializes_with_type_key_and_values() {
    let record_type = RecordTypeBuilder::new("Article")
        .property("id", Serial)
        .property("title", Text)
        .property("deleted", ParanoidBoolean)
        .property("regexp", RegexpProperty)
        .build()
        .unwrap();

    let mut record = Record::new(&record_type);
    record.set("title", Some(Value::from("hello"))).unwrap();
    record
        .set("regexp", Some(Value::Pattern(Regex::new(r"\d+").unwrap())))
        .unwrap();

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], "Article");
    assert!(json["key"].is_null());
    assert_eq!(json["values"]["title"]["text"], "hello");
    assert_eq!(json["values"]["deleted"]["boolean"], false);
    assert_eq!(json["values"]["regexp"]["pattern"], r"\d+");
}

#[test]
fn pattern_value_deserializes_through_codec() {
    let value: Value = serde_json::from_value(serde_json::json!({ "pattern": "[a-z]\\d+" })).unwrap();
    assert_eq!(value.as_pattern().unwrap().as_str(), r"[a-z]\d+");

    let err = serde_json::from_value::<Value>(serde_json::json!({ "pattern": "(" })).unwrap_err();
    assert!(err.to_string().contains("invalid pattern source"));
}

#[test]
fn save_updates_persisted_fields() {
    let record_type = RecordTypeBuilder::new("Task")
        .property("id", Serial)
        .property("title", Text)
        .property("priority", Integer)
        .property("external_id", UuidProperty)
        .build()
        .unwrap();
    let conn = open_db_in_memory().unwrap();
    let service =
        RecordService::new(SqliteRecordRepository::try_new(&conn, &[&record_type]).unwrap());

    let external_id = Uuid::new_v4();
    let mut record = Record::new(&record_type);
    record.set("title", Some(Value::from("draft"))).unwrap();
    assert!(service.save(&mut record).unwrap());
    let key = record.key().unwrap();

    record.set("title", Some(Value::from("final"))).unwrap();
    record.set("priority", Some(Value::Integer(3))).unwrap();
    record.set("external_id", Some(Value::Uuid(external_id))).unwrap();
    assert!(service.save(&mut record).unwrap());

    let loaded = service.get(&record_type, key).unwrap().unwrap();
    assert_eq!(loaded.get_text("title"), Some("final"));
    assert_eq!(loaded.get_i64("priority"), Some(3));
    assert_eq!(loaded.get("external_id"), Some(&Value::Uuid(external_id)));
    assert_eq!(loaded.get_i64("id"), Some(key));
}

#[test]
fn create_rejects_already_persisted_record() {
    let record_type = RecordTypeBuilder::new("Task")
        .property("id", Serial)
        .build()
        .unwrap();
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, &[&record_type]).unwrap();

    let mut record = Record::new(&record_type);
    repo.create(&mut record).unwrap();
    assert!(repo.create(&mut record).is_err());
}

#[test]
fn list_pagination_is_ordered_by_key() {
    let record_type = RecordTypeBuilder::new("Task")
        .property("id", Serial)
        .property("deleted", ParanoidBoolean)
        .build()
        .unwrap();
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRecordRepository::try_new(&conn, &[&record_type]).unwrap();

    let mut keys = Vec::new();
    for _ in 0..4 {
        let mut record = Record::new(&record_type);
        keys.push(repo.create(&mut record).unwrap());
    }

    let page = repo
        .list(
            &record_type,
            &RecordQuery {
                limit: Some(2),
                offset: 1,
                ..RecordQuery::default()
            },
        )
        .unwrap();
    let page_keys: Vec<_> = page.iter().filter_map(Record::key).collect();
    assert_eq!(page_keys, keys[1..3].to_vec());

    let tail = repo
        .list(
            &record_type,
            &RecordQuery {
                offset: 3,
                ..RecordQuery::default()
            },
        )
        .unwrap();
    assert_eq!(tail.len(), 1);
}

#[test]
fn paged_collection_reads_requested_window() {
    let record_type = RecordTypeBuilder::new("Task")
        .property("id", Serial)
        .property("deleted", ParanoidBoolean)
        .build()
        .unwrap();
    let conn = open_db_in_memory().unwrap();
    let service =
        RecordService::new(SqliteRecordRepository::try_new(&conn, &[&record_type]).unwrap());

    let mut removed = service.create(&record_type).unwrap();
    let kept = service.create(&record_type).unwrap();
    service.soft_remove(&mut removed).unwrap();

    let mut collection = service.all_with_deleted(&record_type).paged(Some(1), 1);
    assert_eq!(collection.keys().unwrap(), vec![kept.key().unwrap()]);

    collection.reload();
    assert!(!collection.is_loaded());
    assert_eq!(collection.into_records().unwrap().len(), 1);
}
