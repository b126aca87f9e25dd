//! Request dispatch.
//!
//! The route table is built once via explicit registration before serving
//! starts and is read-only afterwards. Lookup is a linear scan in
//! registration order using literal *prefix* matching - deliberately not
//! segment-exact and not longest-match. When registered prefixes overlap
//! (say "/rest" and "/rest/stats"), whichever was registered first wins for
//! every path under both; registration order is part of the contract.

use std::sync::Arc;

use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// A registered handler: takes the request, returns a response, or `None`
/// for a handler fault (the session turns that into a 500).
pub type Handler = Arc<dyn Fn(&Request) -> Option<Response> + Send + Sync>;

/// The method side of a route entry: one literal method, or any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodMatcher {
    Exact(Method),
    Any,
}

impl MethodMatcher {
    fn matches(&self, method: Method) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Exact(expected) => *expected == method,
        }
    }
}

struct RouteEntry {
    matcher: MethodMatcher,
    prefix: String,
    handler: Handler,
}

/// The ordered route table.
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder {
            entries: Vec::new(),
        }
    }

    /// The first entry whose prefix literally starts the request path and
    /// whose method matches. `None` means the caller should fall back to the
    /// default static-file behavior.
    pub fn find(&self, request: &Request) -> Option<&Handler> {
        let method = request.method?;
        let path = request.path.as_deref()?;

        self.entries
            .iter()
            .find(|entry| path.starts_with(&entry.prefix) && entry.matcher.matches(method))
            .map(|entry| &entry.handler)
    }
}

/// Collects (method, prefix, handler) registrations; order is preserved.
pub struct RouteTableBuilder {
    entries: Vec<RouteEntry>,
}

impl RouteTableBuilder {
    pub fn route(
        mut self,
        matcher: MethodMatcher,
        prefix: impl Into<String>,
        handler: impl Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    ) -> Self {
        self.entries.push(RouteEntry {
            matcher,
            prefix: prefix.into(),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            entries: self.entries,
        }
    }
}
