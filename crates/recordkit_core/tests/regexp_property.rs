use recordkit_core::db::open_db_in_memory;
use recordkit_core::{
    dump_pattern, load_pattern, PropertyError, PropertyType, Record, RecordService,
    RecordTypeBuilder, RegexpProperty, RepoError, Serial, SqliteRecordRepository, StoredValue,
    Value,
};
use regex::Regex;

#[test]
fn load_builds_pattern_from_source_text() {
    let input = r"[a-z]\d+";
    let pattern = load_pattern(Some(input)).unwrap().unwrap();

    assert_eq!(pattern.as_str(), Regex::new(input).unwrap().as_str());
    assert!(pattern.is_match("x42"));
    assert!(!pattern.is_match("42"));
    assert_eq!(dump_pattern(Some(&pattern)).as_deref(), Some(input));
}

#[test]
fn dump_returns_source_text() {
    let pattern = Regex::new(r"\d+").unwrap();
    assert_eq!(dump_pattern(Some(&pattern)), Some("\\d+".to_string()));
}

#[test]
fn nil_passes_through_both_ways() {
    assert!(load_pattern(None).unwrap().is_none());
    assert!(dump_pattern(None).is_none());
    assert_eq!(RegexpProperty.load(None).unwrap(), None);
    assert_eq!(RegexpProperty.load(Some(&StoredValue::Null)).unwrap(), None);
    assert_eq!(RegexpProperty.dump(None).unwrap(), None);
}

#[test]
fn property_converts_between_text_and_pattern() {
    let loaded = RegexpProperty
        .load(Some(&StoredValue::Text(r"^\w+@\w+$".to_string())))
        .unwrap()
        .unwrap();
    assert!(loaded.as_pattern().unwrap().is_match("me@host"));

    let dumped = RegexpProperty.dump(Some(&loaded)).unwrap();
    assert_eq!(dumped, Some(StoredValue::Text(r"^\w+@\w+$".to_string())));
}

#[test]
fn malformed_source_fails_at_load() {
    let err = RegexpProperty
        .load(Some(&StoredValue::Text("(unclosed".to_string())))
        .unwrap_err();
    assert!(matches!(err, PropertyError::InvalidPattern { .. }));
}

#[test]
fn dump_rejects_non_pattern_values() {
    let err = RegexpProperty.dump(Some(&Value::from("text"))).unwrap_err();
    assert!(matches!(err, PropertyError::KindMismatch { .. }));
}

#[test]
fn pattern_survives_storage() {
    let record_type = RecordTypeBuilder::new("Filter")
        .property("id", Serial)
        .property("regexp", RegexpProperty)
        .build()
        .unwrap();
    let conn = open_db_in_memory().unwrap();
    let service =
        RecordService::new(SqliteRecordRepository::try_new(&conn, &[&record_type]).unwrap());

    let mut record = Record::new(&record_type);
    record
        .set("regexp", Some(Value::Pattern(Regex::new(r"[a-z]\d+").unwrap())))
        .unwrap();
    service.save(&mut record).unwrap();

    let raw: String = conn
        .query_row(r#"SELECT "regexp" FROM filters;"#, [], |row| row.get(0))
        .unwrap();
    assert_eq!(raw, r"[a-z]\d+");

    let loaded = service
        .get(&record_type, record.key().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(loaded.get_pattern("regexp").unwrap().as_str(), r"[a-z]\d+");
}

#[test]
fn malformed_stored_pattern_surfaces_on_read() {
    let record_type = RecordTypeBuilder::new("Filter")
        .property("id", Serial)
        .property("regexp", RegexpProperty)
        .build()
        .unwrap();
    let conn = open_db_in_memory().unwrap();
    let service =
        RecordService::new(SqliteRecordRepository::try_new(&conn, &[&record_type]).unwrap());

    conn.execute(r#"INSERT INTO filters ("regexp") VALUES ('[a-');"#, [])
        .unwrap();

    let err = service.all(&record_type).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Property(PropertyError::InvalidPattern { .. })
    ));
}
