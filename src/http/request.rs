use std::collections::HashMap;
use std::fmt;

/// HTTP request methods accepted by the parser.
///
/// The request line is matched against these five literals; anything else on
/// the wire is a grammar error, not an "unknown method" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed HTTP request.
///
/// Requests are constant; their values cannot be changed after the parser
/// creates them. A request with `valid == false` carries whatever fields were
/// parsed before the grammar error, for diagnostic logging only - it is never
/// routed to a handler, and the rule engine resolves it to a 400.
#[derive(Debug, Clone)]
pub struct Request {
    /// The request method, if the request line got that far.
    pub method: Option<Method>,
    /// The abs_path portion of the Request-URI, always starting with "/".
    pub path: Option<String>,
    /// The query component, captured verbatim including the leading "?".
    pub query: Option<String>,
    /// The HTTP version literal, e.g. "HTTP/1.1".
    pub version: Option<String>,
    /// Request headers. Duplicate field names overwrite earlier values.
    pub headers: HashMap<String, String>,
    /// Message body, present only when Content-Length was supplied.
    pub body: Option<Vec<u8>>,
    /// False when the parser hit a grammar error.
    pub valid: bool,
}

impl Request {
    /// Retrieves a header value by name.
    ///
    /// Lookups are exact-case, matching how the parser stored the field-name.
    /// This deviates from HTTP's case-insensitive field names and is kept
    /// deliberately; see the repository notes.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    pub fn exists_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }
}

/// Builder for constructing valid Request values, used by handlers and tests.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    query: Option<String>,
    version: Option<String>,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            query: None,
            version: None,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            query: self.query,
            version: self.version.or_else(|| Some("HTTP/1.1".to_string())),
            headers: self.headers,
            body: self.body,
            valid: true,
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
