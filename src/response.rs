//! Response-side interception.
//!
//! # Data Flow
//! ```text
//! handler writes (status / headers / body chunks)
//!     → WriterInterceptor buffers into the pending response
//!     → body complete: modifier callback rewrites the pending response
//!     → flush: headers once, then body once, into the real sink
//! ```
//!
//! # Responsibilities
//! - Present an ordinary [`ResponseWriter`] to the wrapped handler
//! - Decide, from the pending `Content-Length` header, whether the body is
//!   fixed-length or unbounded
//! - Invoke the modifier exactly once, before any byte reaches the real sink
//! - Guarantee idempotent, single-shot flushing under concurrent close
//!   attempts (peer disconnect vs. handler writes)

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::body::Body;
use crate::codec;
use crate::error::Error;
use crate::message::{Request, RequestContext, Response};
use crate::sink::{Handler, ResponseWriter};

/// Convenient abstraction to inspect and rewrite a fully assembled
/// response, including methods to read, decode/encode and define
/// JSON/XML/string/raw bodies, change the status code and edit headers.
pub struct ResponseModifier<'a> {
    /// Snapshot of the request this response answers.
    pub request: &'a RequestContext,
    pub response: &'a mut Response,
}

impl<'a> ResponseModifier<'a> {
    pub fn new(request: &'a RequestContext, response: &'a mut Response) -> ResponseModifier<'a> {
        ResponseModifier { request, response }
    }

    /// Set a new status code. The canonical reason phrase follows the code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    /// Drain the whole response body, leaving a fresh copy in place for
    /// later stages.
    pub fn read_bytes(&mut self) -> Result<Bytes, Error> {
        self.response.body.read_all().map_err(Error::Read)
    }

    /// Drain the whole response body and return it as a string.
    pub fn read_string(&mut self) -> Result<String, Error> {
        let buf = self.read_bytes()?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Decode the response body as JSON.
    ///
    /// An empty body yields `Ok(None)`; a malformed non-empty body is a
    /// decode error carrying the underlying syntax failure.
    pub fn decode_json<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        let buf = self.read_bytes()?;
        codec::decode_json(&buf)
    }

    /// Decode the response body as XML. Empty bodies yield `Ok(None)`.
    pub fn decode_xml<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        let buf = self.read_bytes()?;
        codec::decode_xml(&buf)
    }

    /// Replace the body with the given bytes.
    pub fn set_bytes(&mut self, body: impl Into<Bytes>) {
        let payload = body.into();
        self.response.content_length = Some(payload.len() as u64);
        self.response.body = Body::from(payload);
    }

    /// Replace the body with the given string.
    pub fn set_string(&mut self, body: impl Into<String>) {
        self.set_bytes(Bytes::from(body.into()));
    }

    /// Serialize a value as the JSON body, setting the content length and
    /// the `application/json` media type. On failure the response is left
    /// untouched.
    pub fn set_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let payload = codec::encode_json(value)?;
        self.install(payload, codec::MEDIA_JSON);
        Ok(())
    }

    /// Install an already-encoded JSON payload verbatim, with the same
    /// header and length side effects as [`ResponseModifier::set_json`].
    pub fn set_json_bytes(&mut self, payload: impl Into<Bytes>) {
        self.install(payload.into(), codec::MEDIA_JSON);
    }

    /// Serialize a value as the XML body, setting the content length and
    /// the `application/xml` media type. On failure the response is left
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
        self.response.content_length = body.len_hint();
        self.response.body = body;
    }

    fn install(&mut self, payload: Bytes, media_type: &'static str) {
        self.response.content_length = Some(payload.len() as u64);
        self.response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(media_type));
        self.response.body = Body::from(payload);
    }
}

/// State shared between the sink and its [`CloseHandle`]: the closed flag
/// and the pending body buffer. The mutex serializes the close transition
/// against an in-flight write or flush.
struct Shared {
    closed: bool,
    buf: Vec<u8>,
}

/// Handle that forces the sink closed from another task.
///
/// Used by the close coordinator when the real sink reports a peer
/// disconnect mid-collection.
#[derive(Clone)]
pub struct CloseHandle {
    shared: Arc<Mutex<Shared>>,
}

impl CloseHandle {
    /// Idempotent close: marks the sink closed and releases the pending
    /// buffer. Calling it again, or after normal completion, is a no-op.
    pub fn close(&self) {
        // A modifier panic poisons the lock; close must still release
        // resources, so recover the guard instead of propagating.
        let mut shared = self
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if shared.closed {
            return;
        }
        shared.closed = true;
        shared.buf = Vec::new();
        debug!("interception sink closed");
    }
}

/// Response sink adapter that buffers every handler write into an
/// in-memory response, invokes the modifier exactly once when the body is
/// fully received, then drains the (possibly rewritten) response into the
/// real sink.
pub struct WriterInterceptor<'a, F> {
    writer: &'a mut dyn ResponseWriter,
    modifier: &'a F,
    request: RequestContext,
    response: Response,
    /// Running total of body bytes received so far.
    written: u64,
    header_written: bool,
    /// Modifier has run and the flush was performed.
    done: bool,
    shared: Arc<Mutex<Shared>>,
}

impl<'a, F> WriterInterceptor<'a, F>
where
    F: Fn(&mut ResponseModifier<'_>) + Send + Sync,
{
    /// Wrap the real sink for one request. The pending response starts as
    /// status 200 with no headers and an empty body.
    pub fn new(
        writer: &'a mut dyn ResponseWriter,
        request: &Request,
        modifier: &'a F,
    ) -> WriterInterceptor<'a, F> {
        WriterInterceptor {
            writer,
            modifier,
            request: request.context(),
            response: Response::new(),
            written: 0,
            header_written: false,
            done: false,
            shared: Arc::new(Mutex::new(Shared {
                closed: false,
                buf: Vec::new(),
            })),
        }
    }

    /// Handle used to finalize the sink out of band.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            shared: self.shared.clone(),
        }
    }

    /// Declared body length, read live from the pending headers. The
    /// handler copies upstream headers into the sink before writing body
    /// bytes, so the header is the source of truth. An unparseable value
    /// counts as undeclared.
    fn declared_length(&self) -> Option<u64> {
        self.response
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Run the modifier over the completed pending response, then flush.
    fn complete(&mut self, shared: &mut Shared, body: Bytes) -> io::Result<usize> {
        self.response.body = Body::from(body);
        {
            let mut modifier = ResponseModifier::new(&self.request, &mut self.response);
            (self.modifier)(&mut modifier);
        }
        debug!(status = %self.response.status, "response modifier applied");
        self.done = true;
        self.flush_header(shared);
        self.flush_body(shared)
    }

    /// Header phase: status line plus header fields, at most once.
    fn flush_header(&mut self, shared: &Shared) {
        if self.header_written || shared.closed {
            return;
        }

        self.writer.write_status(self.response.status);

        let target = self.writer.headers_mut();
        for name in self.response.headers.keys() {
            let mut values = self.response.headers.get_all(name).iter();
            if let Some(first) = values.next() {
                // Replace-by-name: pending fields win over whatever the
                // real sink already carried under the same name.
                target.insert(name.clone(), first.clone());
                for value in values {
                    target.append(name.clone(), value.clone());
                }
            }
        }

        self.header_written = true;
    }

    /// Body phase: one write of the full pending body. The transition to
    /// closed and the buffer release happen even when the read or the sink
    /// write fails; the error is still returned to the caller.
    fn flush_body(&mut self, shared: &mut Shared) -> io::Result<usize> {
        if shared.closed {
            return Ok(0);
        }

        let result = self
            .response
            .body
            .read_all()
            .and_then(|buf| self.writer.write(&buf));

        shared.closed = true;
        shared.buf = Vec::new();

        if let Err(ref e) = result {
            warn!(error = %e, "flush to real sink failed");
        }
        result
    }
}

impl<F> ResponseWriter for WriterInterceptor<'_, F>
where
    F: Fn(&mut ResponseModifier<'_>) + Send + Sync,
{
    fn write_status(&mut self, status: StatusCode) {
        if self.done {
            return;
        }
        self.response.status = status;
    }

    /// The live pending header collection. Handler edits accumulate until
    /// flush time and remain subject to the modifier's own edits.
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response.headers
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<usize> {
        let shared = self.shared.clone();
        let mut shared = shared.lock().unwrap_or_else(PoisonError::into_inner);

        if shared.closed || self.done {
            // Tolerate trailing writes against an already finalized
            // response rather than corrupting it.
            return Ok(chunk.len());
        }

        match self.declared_length() {
            // No declared length: this chunk is the entire body.
            None | Some(0) => self.complete(&mut shared, Bytes::copy_from_slice(chunk)),
            Some(declared) => {
                shared.buf.extend_from_slice(chunk);
                self.written += chunk.len() as u64;
                // Completion triggers on reached-or-exceeded, not exact
                // equality, to survive off-by-one framing from upstream.
                if self.written < declared {
                    return Ok(chunk.len());
                }
                let body = Bytes::from(std::mem::take(&mut shared.buf));
                self.complete(&mut shared, body)
            }
        }
    }
}

/// Response interception middleware. Wraps the next handler so its writes
/// land in a buffering sink instead of the real one.
pub struct ResponseInterceptor<F> {
    modifier: F,
}

/// Build a response interceptor from a modifier callback.
pub fn response<F>(modifier: F) -> ResponseInterceptor<F>
where
    F: Fn(&mut ResponseModifier<'_>) + Send + Sync,
{
    ResponseInterceptor { modifier }
}

impl<F> ResponseInterceptor<F>
where
    F: Fn(&mut ResponseModifier<'_>) + Send + Sync,
{
    /// Package the interceptor and the next stage as a single handler.
    pub fn wrap<H: Handler>(self, next: H) -> InterceptedResponse<F, H> {
        InterceptedResponse {
            modifier: self.modifier,
            next,
        }
    }
}

/// Handler produced by [`ResponseInterceptor::wrap`].
pub struct InterceptedResponse<F, H> {
    modifier: F,
    next: H,
}

#[async_trait]
impl<F, H> Handler for InterceptedResponse<F, H>
where
    F: Fn(&mut ResponseModifier<'_>) + Send + Sync,
    H: Handler,
{
    async fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) {
        // These methods carry no response body at the protocol level;
        // buffering a body that must not exist would corrupt the exchange,
        // so the handler runs against the real sink.
        if request.method == Method::OPTIONS || request.method == Method::HEAD {
            self.next.serve(writer, request).await;
            return;
        }

        let peer_closed = writer.peer_closed();
        let mut interceptor = WriterInterceptor::new(writer, request, &self.modifier);

        // Close coordinator: release resources the moment the peer hangs
        // up, independent of whatever the handler is doing. The task is
        // simply abandoned on normal completion; closing after the flush
        // is a no-op.
        if let Some(signal) = peer_closed {
            let handle = interceptor.close_handle();
            tokio::spawn(async move {
                signal.await;
                handle.close();
            });
        }

        self.next.serve(&mut interceptor, request).await;
    }
}
