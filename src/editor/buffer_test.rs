use super::*;

// =============================================================================
// Buffer
// =============================================================================

#[test]
fn splice_replaces_range_and_reports_it() {
    let mut buffer = Buffer::new("foo bar");
    let splice = buffer.splice(4..7, "baz!").unwrap();
    assert_eq!(buffer.as_str(), "foo baz!");
    assert_eq!(splice, Splice { start: 4, removed: 3, inserted: 4 });
}

#[test]
fn insert_at_end_appends() {
    let mut buffer = Buffer::new("Hello");
    buffer.insert(5, " world").unwrap();
    assert_eq!(buffer.as_str(), "Hello world");
}

#[test]
fn splice_rejects_out_of_bounds_and_leaves_text() {
    let mut buffer = Buffer::new("abc");
    let err = buffer.splice(2..9, "x").unwrap_err();
    assert_eq!(err, BufferError::OutOfBounds { start: 2, end: 9, len: 3 });
    assert_eq!(buffer.as_str(), "abc");
}

#[test]
fn splice_rejects_inverted_range() {
    let mut buffer = Buffer::new("abc");
    let range = std::ops::Range { start: 2, end: 1 };
    assert!(matches!(buffer.splice(range, "x"), Err(BufferError::OutOfBounds { .. })));
}

#[test]
fn splice_rejects_offset_inside_character() {
    let mut buffer = Buffer::new("héllo");
    assert_eq!(buffer.splice(2..2, "x").unwrap_err(), BufferError::NotCharBoundary(2));
    assert_eq!(buffer.as_str(), "héllo");
}

#[test]
fn slice_returns_selected_text() {
    let buffer = Buffer::new("foo bar");
    assert_eq!(buffer.slice(0..3).unwrap(), "foo");
}

#[test]
fn replace_all_reports_changed_span_only() {
    let mut buffer = Buffer::new("foo bar");
    let splice = buffer.replace_all("foo big bar");
    assert_eq!(buffer.as_str(), "foo big bar");
    assert_eq!(splice, Splice { start: 5, removed: 0, inserted: 4 });
}

// =============================================================================
// diff
// =============================================================================

#[test]
fn diff_identical_text_is_empty_splice() {
    assert_eq!(diff("same", "same"), Splice { start: 4, removed: 0, inserted: 0 });
}

#[test]
fn diff_detects_append() {
    assert_eq!(diff("aa", "aaa"), Splice { start: 2, removed: 0, inserted: 1 });
}

#[test]
fn diff_detects_deletion_in_middle() {
    assert_eq!(diff("abcdef", "abef"), Splice { start: 2, removed: 2, inserted: 0 });
}

#[test]
fn diff_stays_on_character_boundaries() {
    // é and ó share their first UTF-8 byte.
    let splice = diff("héllo", "hóllo");
    assert_eq!(splice, Splice { start: 1, removed: 2, inserted: 2 });
}

// =============================================================================
// Remapping
// =============================================================================

#[test]
fn edits_before_offset_shift_it() {
    let splice = Splice { start: 0, removed: 0, inserted: 3 };
    assert_eq!(splice.map_left(4), 7);
    assert_eq!(splice.map_right(4), 7);
}

#[test]
fn edits_after_offset_leave_it() {
    let splice = Splice { start: 5, removed: 2, inserted: 1 };
    assert_eq!(splice.map_left(3), 3);
    assert_eq!(splice.map_right(3), 3);
}

#[test]
fn insertion_exactly_at_offset_depends_on_side() {
    let splice = Splice { start: 3, removed: 0, inserted: 2 };
    assert_eq!(splice.map_left(3), 3);
    assert_eq!(splice.map_right(3), 5);
}

#[test]
fn offset_inside_replaced_text_moves_to_its_end() {
    let splice = Splice { start: 2, removed: 4, inserted: 1 };
    assert_eq!(splice.map_left(4), 3);
    assert_eq!(splice.map_right(4), 3);
}

#[test]
fn deletion_before_offset_pulls_it_back() {
    let splice = Splice { start: 0, removed: 2, inserted: 0 };
    assert_eq!(splice.map_left(5), 3);
}
