use std::collections::HashMap;
use std::path::PathBuf;

const DEFAULT_VERSION: &str = "HTTP/1.1";

/// A lazy response body.
///
/// File content is opened and streamed by the writer at serialization time;
/// nothing is read from disk before that.
#[derive(Debug)]
pub enum Content {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// An HTTP response under construction.
///
/// Handlers create one, the rule engine rewrites it, and the writer consumes
/// it. The status code is required at construction, so a response without a
/// code can never reach serialization. Entity metadata (length, type, hash)
/// lives beside the content source rather than in `headers`; the rule engine
/// decides which of it becomes actual entity headers.
#[derive(Debug)]
pub struct Response {
    /// Response version literal, "HTTP/1.1" unless a handler overrides it.
    pub version: String,
    /// Numeric status code. The reason phrase is derived at write time.
    pub code: u16,
    /// Response headers. Insertion order is immaterial.
    pub headers: HashMap<String, String>,
    /// Body source, if any.
    pub content: Option<Content>,
    /// Declared body length in bytes.
    pub content_length: Option<u64>,
    /// Media type of the body.
    pub content_type: Option<String>,
    /// Stable hash of file-backed content, used for ETag comparisons.
    pub content_hash: Option<String>,
}

impl Response {
    /// A bare response with no entity.
    pub fn new(code: u16) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            code,
            headers: HashMap::new(),
            content: None,
            content_length: None,
            content_type: None,
            content_hash: None,
        }
    }

    /// A response carrying an in-memory body. No content hash is attached,
    /// so conditional-request rules treat it as unhashed content.
    pub fn with_bytes(code: u16, body: Vec<u8>, content_type: impl Into<String>) -> Self {
        let mut response = Response::new(code);
        response.content_length = Some(body.len() as u64);
        response.content = Some(Content::Bytes(body));
        response.content_type = Some(content_type.into());
        response
    }

    /// A response whose body is a file streamed at write time.
    pub fn with_file(
        code: u16,
        path: PathBuf,
        length: u64,
        content_type: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        let mut response = Response::new(code);
        response.content = Some(Content::File(path));
        response.content_length = Some(length);
        response.content_type = Some(content_type.into());
        response.content_hash = Some(hash.into());
        response
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    pub fn put_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// The reason phrase for this response's status code.
    pub fn reason(&self) -> Option<&'static str> {
        reason_phrase(self.code)
    }
}

/// The fixed status-code to reason-phrase table.
///
/// Codes outside this table cannot be serialized; the writer refuses them.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    match code {
        100 => Some("Continue"),
        101 => Some("Switching Protocols"),
        200 => Some("OK"),
        201 => Some("Created"),
        202 => Some("Accepted"),
        203 => Some("Non-Authoritative Information"),
        204 => Some("No Content"),
        205 => Some("Reset Content"),
        206 => Some("Partial Content"),
        300 => Some("Multiple Choices"),
        301 => Some("Moved Permanently"),
        302 => Some("Found"),
        303 => Some("See Other"),
        304 => Some("Not Modified"),
        305 => Some("Use Proxy"),
        307 => Some("Temporary Redirect"),
        400 => Some("Bad Request"),
        401 => Some("Unauthorized"),
        402 => Some("Payment Required"),
        403 => Some("Forbidden"),
        404 => Some("Not Found"),
        405 => Some("Method Not Allowed"),
        406 => Some("Not Acceptable"),
        407 => Some("Proxy Authentication Required"),
        408 => Some("Request Timeout"),
        409 => Some("Conflict"),
        410 => Some("Gone"),
        411 => Some("Length Required"),
        412 => Some("Precondition Failed"),
        413 => Some("Payload Too Large"),
        414 => Some("URI Too Long"),
        415 => Some("Unsupported Media Type"),
        416 => Some("Range Not Satisfiable"),
        417 => Some("Expectation Failed"),
        426 => Some("Upgrade Required"),
        500 => Some("Internal Server Error"),
        501 => Some("Not Implemented"),
        502 => Some("Bad Gateway"),
        503 => Some("Service Unavailable"),
        504 => Some("Gateway Timeout"),
        505 => Some("HTTP Version Not Supported"),
        _ => None,
    }
}
