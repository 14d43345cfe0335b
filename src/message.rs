//! In-memory request and response message model.
//!
//! The host hands the middleware already-parsed messages; nothing here
//! touches the wire. Headers are the ordered, case-insensitive
//! `http::HeaderMap`, mutated in place by handlers and modifiers alike.
//! `content_length` is bookkeeping metadata carried alongside the headers,
//! kept in sync by the body setters.

use http::{HeaderMap, Method, StatusCode, Uri};

use crate::body::Body;

/// Parsed inbound request, mutable in place.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Body,
    /// Declared body length metadata.
    pub content_length: Option<u64>,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Request {
        Request {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Body::empty(),
            content_length: None,
        }
    }

    /// Snapshot of the request fields a response modifier may inspect.
    ///
    /// Taken when the interception sink is installed, while the request
    /// itself is still free to be mutated by the handler chain.
    pub fn context(&self) -> RequestContext {
        RequestContext {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// Read-only view of the originating request, handed to response modifiers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Upstream or pending response, mutable in place.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
    /// Declared body length metadata.
    pub content_length: Option<u64>,
}

impl Response {
    /// Synthetic response: status 200, no headers, empty body.
    pub fn new() -> Response {
        Response {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::empty(),
            content_length: None,
        }
    }
}

impl Default for Response {
    fn default() -> Response {
        Response::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_response_defaults() {
        let res = Response::new();
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.headers.is_empty());
        assert!(res.body.is_empty());
        assert_eq!(res.content_length, None);
    }

    #[test]
    fn test_request_context_snapshot() {
        let mut req = Request::new(Method::POST, Uri::from_static("http://example.com/api"));
        req.headers
            .insert("x-trace", "abc".parse().expect("valid header value"));

        let ctx = req.context();
        assert_eq!(ctx.method, Method::POST);
        assert_eq!(ctx.uri.path(), "/api");
        assert_eq!(ctx.headers.get("x-trace").unwrap(), "abc");

        // Later request mutation does not leak into the snapshot.
        req.headers.insert("x-trace", "xyz".parse().unwrap());
        assert_eq!(ctx.headers.get("x-trace").unwrap(), "abc");
    }
}
