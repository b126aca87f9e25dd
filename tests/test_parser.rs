use std::io;
use std::time::Duration;

use minnow::http::parser::RequestParser;
use minnow::http::request::{Method, Request};

async fn parse(input: &[u8]) -> Request {
    RequestParser::new(input, Duration::from_secs(1))
        .parse()
        .await
        .expect("stream-level failure")
}

async fn parse_result(input: &[u8]) -> io::Result<Request> {
    RequestParser::new(input, Duration::from_secs(1)).parse().await
}

#[tokio::test]
async fn test_parse_simple_get_request() {
    let request = parse(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.method, Some(Method::GET));
    assert_eq!(request.path.as_deref(), Some("/"));
    assert_eq!(request.query, None);
    assert_eq!(request.version.as_deref(), Some("HTTP/1.1"));
    assert_eq!(request.header("Host"), Some("example.com"));
}

#[tokio::test]
async fn test_parse_path_and_query() {
    let request = parse(b"GET /my/query?p1=1&p2=2 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.path.as_deref(), Some("/my/query"));
    assert_eq!(request.query.as_deref(), Some("?p1=1&p2=2"));
}

#[tokio::test]
async fn test_parse_post_with_body() {
    let request = parse(b"POST /api HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello").await;

    assert!(request.valid);
    assert_eq!(request.method, Some(Method::POST));
    assert_eq!(request.body.as_deref(), Some(&b"hello"[..]));
}

#[tokio::test]
async fn test_parse_all_supported_methods() {
    for (text, method) in [
        ("GET", Method::GET),
        ("HEAD", Method::HEAD),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
    ] {
        let raw = format!("{text} / HTTP/1.1\r\n\r\n");
        let request = parse(raw.as_bytes()).await;
        assert!(request.valid, "{text} should parse");
        assert_eq!(request.method, Some(method));
    }
}

#[tokio::test]
async fn test_unsupported_method_is_invalid() {
    // OPTIONS is a real HTTP method but not one of the five literals the
    // parser accepts.
    let request = parse(b"OPTIONS / HTTP/1.1\r\n\r\n").await;

    assert!(!request.valid);
    assert_eq!(request.method, None);
}

#[tokio::test]
async fn test_lowercase_method_is_invalid() {
    let request = parse(b"get / HTTP/1.1\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_uri_without_leading_slash_is_invalid() {
    let request = parse(b"GET example.com/index.html HTTP/1.1\r\n\r\n").await;

    assert!(!request.valid);
    // The method parsed before the URI failed; partial fields are retained
    // for diagnostics.
    assert_eq!(request.method, Some(Method::GET));
    assert_eq!(request.path, None);
}

#[tokio::test]
async fn test_multi_digit_minor_version_is_invalid() {
    // Known limitation kept on purpose: exactly one digit on each side of
    // the dot, so HTTP/1.10 is rejected rather than parsed as 1.10.
    let request = parse(b"GET / HTTP/1.10\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_multi_digit_major_version_is_invalid() {
    let request = parse(b"GET / HTTP/11.1\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_mangled_version_literal_is_invalid() {
    let request = parse(b"GET / HTP/1.1\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_http_10_accepted() {
    let request = parse(b"GET / HTTP/1.0\r\n\r\n").await;
    assert!(request.valid);
    assert_eq!(request.version.as_deref(), Some("HTTP/1.0"));
}

#[tokio::test]
async fn test_header_requires_single_space_after_colon() {
    let request = parse(b"GET / HTTP/1.1\r\nHost:example.com\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_header_name_with_separator_is_invalid() {
    let request = parse(b"GET / HTTP/1.1\r\nBad Header: x\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_header_line_without_colon_is_invalid() {
    let request = parse(b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_duplicate_header_last_value_wins() {
    let request =
        parse(b"GET / HTTP/1.1\r\nX-Tag: first\r\nX-Tag: second\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.header("X-Tag"), Some("second"));
}

#[tokio::test]
async fn test_header_lookup_is_exact_case() {
    // Field names are stored as sent and looked up with exact-string
    // equality - a documented deviation from HTTP's case-insensitive names.
    let request = parse(b"GET / HTTP/1.1\r\nHOST: example.com\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.header("HOST"), Some("example.com"));
    assert_eq!(request.header("Host"), None);
}

#[tokio::test]
async fn test_escaped_characters_kept_verbatim() {
    let request = parse(b"GET /a%20b/c%2Fd HTTP/1.1\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.path.as_deref(), Some("/a%20b/c%2Fd"));
}

#[tokio::test]
async fn test_bad_escape_digit_is_invalid() {
    let request = parse(b"GET /a%2Gb HTTP/1.1\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_truncated_escape_is_invalid() {
    let request = parse(b"GET /a%2 HTTP/1.1\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_segment_params_preserved_in_path() {
    let request = parse(b"GET /file;v=1/part HTTP/1.1\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.path.as_deref(), Some("/file;v=1/part"));
}

#[tokio::test]
async fn test_extra_pchar_punctuation_accepted() {
    let request = parse(b"GET /a:b@c&d=e+f$g,h HTTP/1.1\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.path.as_deref(), Some("/a:b@c&d=e+f$g,h"));
}

#[tokio::test]
async fn test_query_is_captured_verbatim() {
    // Query content gets no validation at all, not even of escapes.
    let request = parse(b"GET /x?a=%%%&[]b HTTP/1.1\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.query.as_deref(), Some("?a=%%%&[]b"));
}

#[tokio::test]
async fn test_empty_query_is_just_the_question_mark() {
    let request = parse(b"GET /x? HTTP/1.1\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.query.as_deref(), Some("?"));
}

#[tokio::test]
async fn test_no_content_length_means_no_body() {
    let request = parse(b"PUT /thing HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.body, None);
}

#[tokio::test]
async fn test_zero_content_length_gives_empty_body() {
    let request = parse(b"POST /api HTTP/1.1\r\nContent-Length: 0\r\n\r\n").await;

    assert!(request.valid);
    assert_eq!(request.body.as_deref(), Some(&b""[..]));
}

#[tokio::test]
async fn test_binary_body() {
    let request =
        parse(b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\x02\x03").await;

    assert!(request.valid);
    assert_eq!(request.body.as_deref(), Some(&[0u8, 1, 2, 3][..]));
}

#[tokio::test]
async fn test_non_numeric_content_length_is_invalid() {
    let request = parse(b"POST /api HTTP/1.1\r\nContent-Length: lots\r\n\r\n").await;
    assert!(!request.valid);
}

#[tokio::test]
async fn test_truncated_body_is_stream_fatal() {
    // EOF before Content-Length bytes arrive is not a grammar error; the
    // connection dies without a response.
    let result = parse_result(b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello").await;

    let err = result.expect_err("expected a stream-level failure");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn test_truncated_headers_are_stream_fatal() {
    let result = parse_result(b"GET / HTTP/1.1\r\nHost: exam").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_empty_stream_is_stream_fatal() {
    let result = parse_result(b"").await;

    let err = result.expect_err("expected a stream-level failure");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn test_idle_timeout_is_stream_fatal() {
    // A peer that connects and sends nothing must not hold the parser
    // forever.
    let (_client, server) = tokio::io::duplex(64);
    let mut parser = RequestParser::new(server, Duration::from_millis(50));

    let err = parser.parse().await.expect_err("expected a timeout");
    assert_eq!(err.kind(), io::ErrorKind::TimedOut);
}

#[tokio::test]
async fn test_partial_fields_survive_a_header_error() {
    let request = parse(b"GET /ok HTTP/1.1\r\nBroken\r\n\r\n").await;

    assert!(!request.valid);
    assert_eq!(request.method, Some(Method::GET));
    assert_eq!(request.path.as_deref(), Some("/ok"));
    assert_eq!(request.version.as_deref(), Some("HTTP/1.1"));
}

#[tokio::test]
async fn test_pipelined_requests_parse_in_sequence() {
    let mut parser = RequestParser::new(
        &b"POST /a HTTP/1.1\r\nContent-Length: 3\r\n\r\nonePOST /b HTTP/1.1\r\nContent-Length: 3\r\n\r\ntwo"[..],
        Duration::from_secs(1),
    );

    let first = parser.parse().await.unwrap();
    let second = parser.parse().await.unwrap();

    assert_eq!(first.path.as_deref(), Some("/a"));
    assert_eq!(first.body.as_deref(), Some(&b"one"[..]));
    assert_eq!(second.path.as_deref(), Some("/b"));
    assert_eq!(second.body.as_deref(), Some(&b"two"[..]));
}
