use std::time::Duration;

use futures::StreamExt;

use super::*;

fn delta(text: &str) -> String {
    serde_json::json!({ "choices": [{ "delta": { "content": text } }] }).to_string()
}

async fn collect_chunks(parts: Vec<Result<Vec<u8>, std::io::Error>>) -> Vec<Result<String, String>> {
    text_chunks(futures::stream::iter(parts))
        .map(|item| item.map_err(|e| e.to_string()))
        .collect()
        .await
}

// =============================================================================
// SseDecoder
// =============================================================================

#[test]
fn event_split_across_reads_is_reassembled() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: {\"a\"").is_empty());
    assert!(decoder.push(b":1}\n").is_empty());
    assert_eq!(decoder.push(b"\n"), vec![SseEvent::Data("{\"a\":1}".into())]);
}

#[test]
fn multiple_events_in_one_read() {
    let mut decoder = SseDecoder::new();
    let events = decoder.push(b"data: one\n\ndata: two\n\n");
    assert_eq!(events, vec![SseEvent::Data("one".into()), SseEvent::Data("two".into())]);
}

#[test]
fn multi_line_data_is_joined_with_newlines() {
    let mut decoder = SseDecoder::new();
    let events = decoder.push(b"data: first\ndata: second\n\n");
    assert_eq!(events, vec![SseEvent::Data("first\nsecond".into())]);
}

#[test]
fn comments_and_other_fields_are_ignored() {
    let mut decoder = SseDecoder::new();
    let events = decoder.push(b": keep-alive\nevent: message\nid: 7\nretry: 100\ndata: x\n\n");
    assert_eq!(events, vec![SseEvent::Data("x".into())]);
}

#[test]
fn crlf_line_endings_are_accepted() {
    let mut decoder = SseDecoder::new();
    assert_eq!(decoder.push(b"data: x\r\n\r\n"), vec![SseEvent::Data("x".into())]);
}

#[test]
fn multibyte_character_split_across_reads() {
    let bytes = "data: é世\n\n".as_bytes();
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(&bytes[..7]).is_empty());
    assert_eq!(decoder.push(&bytes[7..]), vec![SseEvent::Data("é世".into())]);
}

#[test]
fn done_marker_is_its_own_event() {
    let mut decoder = SseDecoder::new();
    assert_eq!(decoder.push(b"data: [DONE]\n\n"), vec![SseEvent::Done]);
}

#[test]
fn finish_flushes_unterminated_event() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: tail").is_empty());
    assert_eq!(decoder.finish(), vec![SseEvent::Data("tail".into())]);
    assert!(decoder.finish().is_empty());
}

// =============================================================================
// parse_stream_delta
// =============================================================================

#[test]
fn delta_content_is_extracted() {
    assert_eq!(parse_stream_delta(&delta("Hi")).unwrap().as_deref(), Some("Hi"));
}

#[test]
fn role_only_and_empty_deltas_carry_no_text() {
    let role = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
    assert_eq!(parse_stream_delta(role).unwrap(), None);
    assert_eq!(parse_stream_delta(&delta("")).unwrap(), None);
    assert_eq!(parse_stream_delta(r#"{"choices":[]}"#).unwrap(), None);
}

#[test]
fn inline_error_object_becomes_stream_error() {
    let err = parse_stream_delta(r#"{"error":{"message":"quota exhausted"}}"#).unwrap_err();
    assert!(matches!(err, LlmError::Stream(ref msg) if msg == "quota exhausted"));
}

#[test]
fn invalid_json_is_parse_error() {
    assert!(matches!(parse_stream_delta("{oops"), Err(LlmError::ApiParse(_))));
}

// =============================================================================
// text_chunks
// =============================================================================

#[tokio::test]
async fn chunks_follow_event_order_and_stop_at_done() {
    let body = format!(
        "data: {}\n\ndata: {}\n\ndata: [DONE]\n\ndata: {}\n\n",
        delta("Hello"),
        delta(" world"),
        delta("ignored")
    );
    let bytes = body.into_bytes();
    let (a, b) = bytes.split_at(13);
    let chunks = collect_chunks(vec![Ok(a.to_vec()), Ok(b.to_vec())]).await;
    assert_eq!(chunks, vec![Ok("Hello".to_string()), Ok(" world".to_string())]);
}

#[tokio::test]
async fn body_without_done_still_completes() {
    let body = format!("data: {}", delta("end"));
    let chunks = collect_chunks(vec![Ok(body.into_bytes())]).await;
    assert_eq!(chunks, vec![Ok("end".to_string())]);
}

#[tokio::test]
async fn transport_error_ends_stream() {
    let first = format!("data: {}\n\n", delta("partial")).into_bytes();
    let chunks = collect_chunks(vec![
        Ok(first),
        Err(std::io::Error::other("connection reset")),
        Ok(b"data: never\n\n".to_vec()),
    ])
    .await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], Ok("partial".to_string()));
    assert!(chunks[1].as_ref().is_err_and(|e| e.contains("connection reset")));
}

#[tokio::test]
async fn provider_error_event_ends_stream() {
    let body = format!("data: {}\n\ndata: {{\"error\":{{\"message\":\"boom\"}}}}\n\ndata: {}\n\n", delta("a"), delta("b"));
    let chunks = collect_chunks(vec![Ok(body.into_bytes())]).await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], Ok("a".to_string()));
    assert!(chunks[1].is_err());
}

// =============================================================================
// idle_timeout
// =============================================================================

#[tokio::test(start_paused = true)]
async fn steady_stream_outlives_the_idle_period() {
    let parts = futures::stream::iter(0u8..5).then(|i| async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        Ok::<_, std::io::Error>(vec![i])
    });
    let items: Vec<_> = idle_timeout(Box::pin(parts), Duration::from_secs(1)).collect().await;
    assert_eq!(items, (0u8..5).map(|i| Ok(vec![i])).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn stalled_stream_fails_after_idle_period() {
    let parts = futures::stream::iter(vec![Ok::<_, std::io::Error>(b"a".to_vec())]).chain(futures::stream::pending());
    let items: Vec<_> = idle_timeout(parts, Duration::from_secs(2)).collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok(b"a".to_vec()));
    assert!(items[1].as_ref().is_err_and(|e| e.contains("no data")));
}

#[tokio::test(start_paused = true)]
async fn stalled_body_surfaces_as_stream_error_after_decoded_text() {
    let first = format!("data: {}\n\n", delta("partial")).into_bytes();
    let parts = futures::stream::iter(vec![Ok::<_, std::io::Error>(first)]).chain(futures::stream::pending());
    let chunks: Vec<_> = text_chunks(idle_timeout(parts, Duration::from_secs(1))).collect().await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].as_deref().ok(), Some("partial"));
    assert!(matches!(chunks[1], Err(LlmError::Stream(_))));
}
