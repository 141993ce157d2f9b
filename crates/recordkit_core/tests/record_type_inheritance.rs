use recordkit_core::{
    DefinitionError, ParanoidBoolean, ParanoidTimestamp, Predicate, RecordType,
    RecordTypeBuilder, Serial, Text, Value,
};
use std::sync::Arc;

fn draft() -> Arc<RecordType> {
    RecordTypeBuilder::new("Draft")
        .storage_name("articles")
        .property("id", Serial)
        .property("deleted", ParanoidBoolean)
        .timestamps()
        .before_destroy(|_| Ok(()))
        .build()
        .unwrap()
}

fn registry(record_type: &RecordType) -> Vec<&str> {
    record_type.paranoid_fields().collect()
}

#[test]
fn subtype_inherits_paranoid_fields_without_redeclaring() {
    let draft = draft();
    let article = RecordType::derive(&draft, "Article").build().unwrap();
    let review = RecordType::derive(&article, "Review").build().unwrap();

    assert_eq!(registry(&article), vec!["deleted"]);
    assert_eq!(registry(&review), vec!["deleted"]);
    assert_eq!(article.parent_name(), Some("Draft"));
    assert_eq!(review.parent_name(), Some("Article"));
}

#[test]
fn subtype_declarations_do_not_leak_into_parent() {
    let draft = draft();
    let article = RecordType::derive(&draft, "Article")
        .property("archived_at", ParanoidTimestamp)
        .build()
        .unwrap();

    assert_eq!(registry(&article), vec!["archived_at", "deleted"]);
    assert_eq!(registry(&draft), vec!["deleted"]);
    assert!(draft.property("archived_at").is_none());
}

#[test]
fn sibling_subtypes_have_independent_registries() {
    let draft = draft();
    let article = RecordType::derive(&draft, "Article")
        .property("archived_at", ParanoidTimestamp)
        .build()
        .unwrap();
    let memo = RecordType::derive(&draft, "Memo").build().unwrap();

    assert!(article.is_paranoid_field("archived_at"));
    assert!(!memo.is_paranoid_field("archived_at"));
}

#[test]
fn subtype_keeps_storage_timestamps_and_hooks() {
    let draft = draft();
    let article = RecordType::derive(&draft, "Article").build().unwrap();

    assert_eq!(article.storage_name(), "articles");
    assert!(article.has_timestamps());
    assert_eq!(article.key_name(), "id");
    assert_eq!(article.before_destroy_hook_count(), 1);
    assert!(article.property("created_at").is_some());
    assert!(article.property("updated_at").is_some());
}

#[test]
fn default_storage_name_comes_from_type_name() {
    let note = RecordTypeBuilder::new("StickyNote")
        .property("id", Serial)
        .build()
        .unwrap();
    assert_eq!(note.storage_name(), "sticky_notes");
    assert!(!note.is_paranoid());
    assert!(note.default_scope().is_empty());
}

#[test]
fn default_scope_lists_every_marker_predicate() {
    let draft = draft();
    let article = RecordType::derive(&draft, "Article")
        .property("archived_at", ParanoidTimestamp)
        .build()
        .unwrap();

    let scope = article.default_scope();
    assert_eq!(scope.len(), 2);
    assert_eq!(scope[0].field, "archived_at");
    assert_eq!(scope[0].predicate, Predicate::IsNull);
    assert_eq!(scope[1].field, "deleted");
    assert_eq!(scope[1].predicate, Predicate::Equals(Value::Boolean(false)));
}

#[test]
fn subtype_cannot_redeclare_inherited_property() {
    let draft = draft();
    let err = RecordType::derive(&draft, "Article")
        .property("deleted", ParanoidBoolean)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        DefinitionError::DuplicateProperty { property, .. } if property == "deleted"
    ));
}

#[test]
fn declaring_non_paranoid_property_fails() {
    let err = RecordTypeBuilder::new("Note")
        .property("id", Serial)
        .property("title", Text)
        .declare_paranoid("title")
        .build()
        .unwrap_err();
    assert!(matches!(err, DefinitionError::NotParanoid { property, .. } if property == "title"));
}

#[test]
fn declaring_missing_property_fails() {
    let err = RecordTypeBuilder::new("Note")
        .property("id", Serial)
        .declare_paranoid("gone")
        .build()
        .unwrap_err();
    assert!(matches!(err, DefinitionError::NotParanoid { property, .. } if property == "gone"));
}

#[test]
fn two_keys_are_rejected() {
    let err = RecordTypeBuilder::new("Note")
        .property("id", Serial)
        .property("other_id", Serial)
        .build()
        .unwrap_err();
    assert!(matches!(err, DefinitionError::MultipleKeys { keys, .. } if keys.len() == 2));
}
