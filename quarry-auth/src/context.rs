use http::{HeaderMap, Method};

/// The request-scoped information enrichers and claims validators may
/// consult. Always passed explicitly; the core keeps no ambient request
/// state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
}

impl RequestContext {
    pub fn new<S: Into<String>>(method: Method, path: S, headers: HeaderMap) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Looks up a header value, ignoring values that are not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            headers: HeaderMap::new(),
        }
    }
}
