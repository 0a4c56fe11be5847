use crate::supervisor::{LogBuffer, LogStream};

fn filled(capacity: usize, count: usize) -> LogBuffer {
    let buffer = LogBuffer::new(capacity);
    for i in 0..count {
        buffer.push(LogStream::Stdout, format!("line {i}"));
    }
    buffer
}

#[test]
fn test_lines_kept_in_arrival_order() {
    let buffer = LogBuffer::new(10);
    buffer.push(LogStream::Stdout, "first".into());
    buffer.push(LogStream::Stderr, "second".into());
    buffer.push(LogStream::Stdout, "third".into());

    let lines = buffer.tail(None);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].line, "first");
    assert_eq!(lines[1].line, "second");
    assert_eq!(lines[2].line, "third");
}

#[test]
fn test_error_stream_tagged_distinctly() {
    let buffer = LogBuffer::new(10);
    buffer.push(LogStream::Stdout, "out".into());
    buffer.push(LogStream::Stderr, "err".into());

    let lines = buffer.tail(None);
    assert_eq!(lines[0].stream, LogStream::Stdout);
    assert_eq!(lines[1].stream, LogStream::Stderr);
}

#[test]
fn test_oldest_evicted_on_overflow() {
    let buffer = filled(3, 5);

    let lines = buffer.tail(None);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].line, "line 2");
    assert_eq!(lines[2].line, "line 4");
}

#[test]
fn test_len_never_exceeds_capacity() {
    let buffer = filled(500, 1200);
    assert_eq!(buffer.len(), 500);
}

#[test]
fn test_tail_returns_most_recent_in_order() {
    let buffer = filled(10, 10);

    let lines = buffer.tail(Some(3));
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].line, "line 7");
    assert_eq!(lines[1].line, "line 8");
    assert_eq!(lines[2].line, "line 9");
}

#[test]
fn test_tail_limit_larger_than_contents() {
    let buffer = filled(10, 4);
    assert_eq!(buffer.tail(Some(100)).len(), 4);
}

#[test]
fn test_tail_default_is_full_capacity() {
    let buffer = filled(5, 8);
    assert_eq!(buffer.tail(None).len(), 5);
}

#[test]
fn test_clear_empties_buffer() {
    let buffer = filled(10, 4);
    assert!(!buffer.is_empty());

    buffer.clear();
    assert!(buffer.is_empty());
    assert!(buffer.tail(None).is_empty());
}
