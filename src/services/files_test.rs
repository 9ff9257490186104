use std::time::Duration;

use super::*;

#[test]
fn sanitize_replaces_unsafe_characters() {
    assert_eq!(sanitize_title(r#"a/b\c?d%e*f:g|h"i<j>k"#), "a-b-c-d-e-f-g-h-i-j-k");
    assert_eq!(sanitize_title("  Chapter 1  "), "Chapter 1");
}

#[test]
fn sanitize_never_yields_empty_or_dot_names() {
    assert_eq!(sanitize_title(""), "untitled");
    assert_eq!(sanitize_title("   "), "untitled");
    assert_eq!(sanitize_title(".."), "untitled");
}

#[test]
fn export_writes_exact_bytes_and_creates_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("nested").join("docs");
    let content = "# Heading\r\n\n*emphasis*  \n";

    let path = export_markdown(&dir, "Plot: Act I", content).unwrap();
    assert_eq!(path, dir.join("Plot- Act I.md"));
    assert_eq!(std::fs::read(&path).unwrap(), content.as_bytes());
}

#[test]
fn export_overwrites_existing_file() {
    let tmp = tempfile::tempdir().unwrap();
    export_markdown(tmp.path(), "Same", "old").unwrap();
    export_markdown(tmp.path(), "Same", "new").unwrap();
    assert_eq!(read_markdown(tmp.path(), "Same").unwrap(), "new");
}

#[test]
fn list_missing_dir_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(list_markdown(&tmp.path().join("absent")).unwrap().is_empty());
}

#[test]
fn list_only_includes_markdown_newest_first() {
    let tmp = tempfile::tempdir().unwrap();
    export_markdown(tmp.path(), "older", "a").unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "skip").unwrap();
    std::fs::create_dir(tmp.path().join("folder.md")).unwrap();

    let older = std::fs::File::options()
        .write(true)
        .open(tmp.path().join("older.md"))
        .unwrap();
    older
        .set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();
    export_markdown(tmp.path(), "newer", "b").unwrap();

    let titles: Vec<String> = list_markdown(tmp.path())
        .unwrap()
        .into_iter()
        .map(|f| f.title)
        .collect();
    assert_eq!(titles, vec!["newer".to_string(), "older".to_string()]);
}

#[test]
fn read_missing_file_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let err = read_markdown(tmp.path(), "nothing").unwrap_err();
    assert!(matches!(err, FileError::NotFound(_)));
    assert_eq!(err.error_code(), "E_FILE_NOT_FOUND");
}
