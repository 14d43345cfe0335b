//! Request-side interception.
//!
//! # Responsibilities
//! - Expose a [`RequestModifier`] with read, decode/encode and body
//!   replacement operations over an in-flight request
//! - Gate the user modifier behind an ordered chain of filter predicates
//! - Hand the (possibly rewritten) request to the next stage unconditionally
//!
//! The request side is a stateless, synchronous decorator: there is no
//! buffering problem and no error channel. A modifier that needs to signal
//! failure must encode it in the request it produces.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::body::Body;
use crate::codec;
use crate::error::Error;
use crate::message::Request;
use crate::sink::{Handler, ResponseWriter};

/// Predicate deciding whether the request modifier applies.
pub type Filter = Box<dyn Fn(&Request) -> bool + Send + Sync>;

/// Convenient abstraction to inspect and rewrite an in-flight request,
/// including methods to read, decode/encode and define JSON/XML/string/raw
/// bodies and to edit headers through the request itself.
pub struct RequestModifier<'a> {
    pub request: &'a mut Request,
}

impl<'a> RequestModifier<'a> {
    pub fn new(request: &'a mut Request) -> RequestModifier<'a> {
        RequestModifier { request }
    }

    /// Drain the whole request body, leaving a fresh copy in place for
    /// later stages.
    pub fn read_bytes(&mut self) -> Result<Bytes, Error> {
        self.request.body.read_all().map_err(Error::Read)
    }

    /// Drain the whole request body and return it as a string.
    pub fn read_string(&mut self) -> Result<String, Error> {
        let buf = self.read_bytes()?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Decode the request body as JSON.
    ///
    /// An empty body yields `Ok(None)`; a malformed non-empty body is a
    /// decode error carrying the underlying syntax failure.
    pub fn decode_json<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        let buf = self.read_bytes()?;
        codec::decode_json(&buf)
    }

    /// Decode the request body as XML. Empty bodies yield `Ok(None)`.
    pub fn decode_xml<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        let buf = self.read_bytes()?;
        codec::decode_xml(&buf)
    }

    /// Replace the body with the given bytes.
    ///
    /// Silently ignored when the method must not carry a request body
    /// (GET, HEAD).
    pub fn set_bytes(&mut self, body: impl Into<Bytes>) {
        if self.request.method == Method::GET || self.request.method == Method::HEAD {
            return;
        }
        let payload = body.into();
        self.request.content_length = Some(payload.len() as u64);
        self.request.body = Body::from(payload);
    }

    /// Replace the body with the given string. Ignored for GET and HEAD.
    pub fn set_string(&mut self, body: impl Into<String>) {
        self.set_bytes(Bytes::from(body.into()));
    }

    /// Serialize a value as the JSON body, setting the content length and
    /// the `application/json` media type. On failure the request is left
    /// untouched.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let payload = codec::encode_json(value)?;
        self.install(payload, codec::MEDIA_JSON);
        Ok(())
    }

    /// Install an already-encoded JSON payload verbatim, with the same
    /// header and length side effects as [`RequestModifier::set_json`].
    pub fn set_json_bytes(&mut self, payload: impl Into<Bytes>) {
        self.install(payload.into(), codec::MEDIA_JSON);
    }

    /// Serialize a value as the XML body, setting the content length and
    /// the `application/xml` media type. On failure the request is left
    /// untouched.
    pub fn set_xml<T: Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let payload = codec::encode_xml(value)?;
        self.install(payload, codec::MEDIA_XML);
        Ok(())
    }

    /// Install an already-encoded XML payload verbatim.
    pub fn set_xml_bytes(&mut self, payload: impl Into<Bytes>) {
        self.install(payload.into(), codec::MEDIA_XML);
    }

    /// Adopt a reader as the body. The content length is recorded only when
    /// the stream's total size is statically knowable; otherwise it is
    /// cleared, signaling an unbounded body downstream.
    pub fn set_reader(&mut self, body: impl Into<Body>) {
        let body = body.into();
        self.request.content_length = body.len_hint();
        self.request.body = body;
    }

    fn install(&mut self, payload: Bytes, media_type: &'static str) {
        self.request.content_length = Some(payload.len() as u64);
        self.request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(media_type));
        self.request.body = Body::from(payload);
    }
}

/// Applies a request modifier, gated by a chain of filters, then forwards
/// to the next stage unconditionally.
pub struct RequestInterceptor<F> {
    modifier: F,
    filters: Vec<Filter>,
}

/// Build a request interceptor from a modifier callback.
pub fn request<F>(modifier: F) -> RequestInterceptor<F>
where
    F: Fn(&mut RequestModifier<'_>) + Send + Sync,
{
    RequestInterceptor {
        modifier,
        filters: Vec::new(),
    }
}

impl<F> RequestInterceptor<F>
where
    F: Fn(&mut RequestModifier<'_>) + Send + Sync,
{
    /// Append a filter predicate. The modifier runs only if every filter
    /// accepts the request; an empty chain accepts everything.
    pub fn filter(mut self, f: impl Fn(&Request) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Box::new(f));
        self
    }

    fn accepts(&self, request: &Request) -> bool {
        self.filters.iter().all(|f| f(request))
    }

    /// Run the interception stage, then hand the request to `next`.
    pub async fn handle(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) {
        if self.accepts(request) {
            debug!(method = %request.method, uri = %request.uri, "request modifier applied");
            let mut modifier = RequestModifier::new(request);
            (self.modifier)(&mut modifier);
        }
        next.serve(writer, request).await;
    }

    /// Package the interceptor and the next stage as a single handler.
    pub fn wrap<H: Handler>(self, next: H) -> InterceptedRequest<F, H> {
        InterceptedRequest {
            interceptor: self,
            next,
        }
    }
}

/// Handler produced by [`RequestInterceptor::wrap`].
pub struct InterceptedRequest<F, H> {
    interceptor: RequestInterceptor<F>,
    next: H,
}

#[async_trait]
impl<F, H> Handler for InterceptedRequest<F, H>
where
    F: Fn(&mut RequestModifier<'_>) + Send + Sync,
    H: Handler,
{
    async fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) {
        self.interceptor.handle(writer, request, &self.next).await;
    }
}
