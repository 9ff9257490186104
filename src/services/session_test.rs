use super::*;
use crate::storage::MemoryStore;

#[test]
fn put_get_clear() {
    let cache = SessionCache::new(Arc::new(MemoryStore::new()));
    assert!(cache.get().unwrap().is_none());

    let entry = SessionEntry { id: Some("d1".into()), title: "T".into(), content: "c".into() };
    cache.put(&entry).unwrap();
    assert_eq!(cache.get().unwrap(), Some(entry));

    assert!(cache.clear().unwrap());
    assert!(cache.get().unwrap().is_none());
}

#[test]
fn entry_without_id_omits_field() {
    let entry = SessionEntry { id: None, title: "T".into(), content: "c".into() };
    let json = serde_json::to_value(&entry).unwrap();
    assert!(json.get("id").is_none());
}
