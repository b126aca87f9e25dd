//! Response finalization rules.
//!
//! Every response a handler produces passes through [`finalize`] together
//! with the request that caused it. The rules run in a fixed order; the
//! error rules short-circuit, discarding whatever the handler built and
//! rebuilding a minimal response whose headers are exactly
//! {Date, Server, Connection}.

use std::time::SystemTime;

use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// Server identification sent on every response.
pub const SERVER_ID: &str = "Minnow/0.1";

/// Apply the response rules, in order:
///
/// 1. Invalid request: 400, short-circuit.
/// 2. Connection: "close" when the client asked for it or sent no
///    Connection header at all; "Keep-Alive" only when explicitly requested.
/// 3. Date, stamped on every response.
/// 4. Expect, any value: 417, short-circuit.
/// 5. HTTP/1.1 without Host: 400, short-circuit.
/// 6. If-Match not matching the content hash: 412, short-circuit.
/// 7. If-None-Match matching: 304 for GET/HEAD (later rules still run),
///    412 short-circuit for anything else.
/// 8. Range, any value: 416, short-circuit.
/// 9. ETag from the content hash.
/// 10. Server identification.
/// 11. Request Content-Encoding, any value: 415, short-circuit.
/// 12. Content-Length from the declared length.
/// 13. Content-Type from the declared type.
pub fn finalize(mut response: Response, request: &Request) -> Response {
    // First thing, check for an invalid request before applying any rule
    // that reads request fields.
    if !request.valid {
        return error_response(400, request);
    }

    apply_connection(&mut response, request);

    response.put_header("Date", httpdate::fmt_http_date(SystemTime::now()));

    // Expect ; Section 14.20
    // Always respond with a 417 (Expectation Failed).
    if request.exists_header("Expect") {
        return error_response(417, request);
    }

    // Host ; Section 14.23
    // Any HTTP/1.1 request message lacking a Host header gets a 400.
    if request.version.as_deref() == Some("HTTP/1.1") && !request.exists_header("Host") {
        return error_response(400, request);
    }

    // If-Match ; Section 14.24
    if let Some(value) = request.header("If-Match") {
        if !hash_matches(value, response.content_hash.as_deref()) {
            return error_response(412, request);
        }
    }

    // If-None-Match ; Section 14.26
    // On a match, GET and HEAD turn into a 304 and the remaining rules
    // still run; every other method is a 412.
    if let Some(value) = request.header("If-None-Match") {
        if hash_matches(value, response.content_hash.as_deref()) {
            match request.method {
                Some(Method::GET) | Some(Method::HEAD) => response.code = 304,
                _ => return error_response(412, request),
            }
        }
    }

    // Range ; Section 14.35
    // Ranges are not served; requesting one is a 416.
    if request.exists_header("Range") {
        return error_response(416, request);
    }

    // ETag ; Section 14.19
    let etag = response
        .content_hash
        .as_deref()
        .map(|hash| format!("\"{hash}\""));
    if let Some(etag) = etag {
        response.put_header("ETag", etag);
    }

    // Server ; Section 14.38
    response.put_header("Server", SERVER_ID);

    // Content-Encoding ; Section 14.11
    // No encodings are accepted in request entities.
    if request.exists_header("Content-Encoding") {
        return error_response(415, request);
    }

    // Content-Length ; Section 14.13
    if let Some(length) = response.content_length {
        response.put_header("Content-Length", length.to_string());
    }

    // Content-Type ; Section 14.17
    let content_type = response.content_type.clone();
    if let Some(content_type) = content_type {
        response.put_header("Content-Type", content_type);
    }

    response
}

/// A fresh minimal response for a short-circuited rule: only Date, Server,
/// and Connection survive. Building a new value rather than clearing the old
/// one keeps the short-circuit behavior easy to reason about.
fn error_response(code: u16, request: &Request) -> Response {
    let mut response = Response::new(code);

    response.put_header("Date", httpdate::fmt_http_date(SystemTime::now()));
    response.put_header("Server", SERVER_ID);
    apply_connection(&mut response, request);

    response
}

/// Connection ; Section 14.10
///
/// Three checks, in order, later ones overriding earlier ones: "close" when
/// the client asked for a close, "close" when the header is absent,
/// "Keep-Alive" when the client asked for keep-alive. A Connection header
/// with any other value leaves the response without one.
fn apply_connection(response: &mut Response, request: &Request) {
    let value = request.header("Connection");

    if value.is_some_and(|v| v.eq_ignore_ascii_case("close")) {
        response.put_header("Connection", "close");
    }
    if value.is_none() {
        response.put_header("Connection", "close");
    }
    if value.is_some_and(|v| v.eq_ignore_ascii_case("keep-alive")) {
        response.put_header("Connection", "Keep-Alive");
    }
}

/// Entity-tag comparison: the header value against `"<hash>"`, ASCII
/// case-insensitive. A response without a content hash never matches.
fn hash_matches(header_value: &str, hash: Option<&str>) -> bool {
    match hash {
        Some(hash) => header_value.eq_ignore_ascii_case(&format!("\"{hash}\"")),
        None => false,
    }
}
