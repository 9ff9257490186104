use super::*;
use crate::storage::MemoryStore;
use crate::storage::test_helpers::FlakyStore;

fn store() -> DocumentStore {
    DocumentStore::new(Arc::new(MemoryStore::new()))
}

#[test]
fn create_assigns_id_and_timestamps() {
    let docs = store();
    let doc = docs.create("Plot", "text").unwrap();
    assert!(!doc.id.is_empty());
    assert_eq!(doc.created_at, doc.updated_at);
    assert_eq!(docs.get(&doc.id).unwrap(), doc);
}

#[test]
fn list_keeps_creation_order() {
    let docs = store();
    let a = docs.create("A", "").unwrap();
    let b = docs.create("B", "").unwrap();
    let ids: Vec<String> = docs.list().unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

#[test]
fn update_moves_timestamp_strictly_forward() {
    let docs = store();
    let doc = docs.create("Plot", "v1").unwrap();
    let first = docs.update(&doc.id, "Plot", "v2").unwrap();
    let second = docs.update(&doc.id, "Plot", "v3").unwrap();

    assert!(first.updated_at > doc.updated_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.created_at, doc.created_at);
    assert_eq!(docs.get(&doc.id).unwrap().content, "v3");
}

#[test]
fn update_unknown_id_is_not_found() {
    let docs = store();
    let err = docs.update("missing", "t", "c").unwrap_err();
    assert!(matches!(err, DocumentError::NotFound(ref id) if id == "missing"));
    assert_eq!(err.error_code(), "E_DOCUMENT_NOT_FOUND");
}

#[test]
fn save_creates_without_id_and_updates_with_one() {
    let docs = store();
    let created = docs.save(None, "T", "one").unwrap();
    let updated = docs.save(Some(&created.id), "T2", "two").unwrap();
    assert_eq!(created.id, updated.id);
    assert_eq!(updated.title, "T2");
    assert_eq!(docs.list().unwrap().len(), 1);
}

#[test]
fn upsert_by_title_reuses_matching_document() {
    let docs = store();
    let first = docs.upsert_by_title("Notes", "a").unwrap();
    let second = docs.upsert_by_title("Notes", "b").unwrap();
    docs.upsert_by_title("Other", "c").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(docs.find_by_title("Notes").unwrap().unwrap().content, "b");
    assert_eq!(docs.list().unwrap().len(), 2);
}

#[test]
fn delete_unknown_id_returns_false_without_writing() {
    let flaky = Arc::new(FlakyStore::new());
    let docs = DocumentStore::new(flaky.clone());
    docs.create("Keep", "me").unwrap();

    flaky.fail_writes(true);
    assert!(!docs.delete("missing").unwrap());
    assert_eq!(docs.list().unwrap().len(), 1);
}

#[test]
fn delete_removes_document() {
    let docs = store();
    let doc = docs.create("Gone", "").unwrap();
    assert!(docs.delete(&doc.id).unwrap());
    assert!(docs.find(&doc.id).unwrap().is_none());
}

#[test]
fn documents_serialize_with_camel_case_fields() {
    let docs = store();
    let doc = docs.create("T", "c").unwrap();
    let json = serde_json::to_value(&doc).unwrap();
    assert!(json.get("createdAt").is_some());
    assert!(json.get("updatedAt").is_some());
}

#[test]
fn corrupt_collection_is_reported() {
    let memory = Arc::new(MemoryStore::new());
    memory.set(DOCUMENTS_KEY, "{not json").unwrap();
    let docs = DocumentStore::new(memory);
    let err = docs.list().unwrap_err();
    assert_eq!(err.error_code(), "E_STORAGE_CORRUPT");
}
