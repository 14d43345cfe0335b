//! Host collaborator contracts.
//!
//! The middleware consumes an abstract byte-oriented response sink and an
//! abstract handler chain; it neither opens connections nor parses wire
//! bytes. The host adapts its real connection type to [`ResponseWriter`]
//! and drives each request on its own task.

use std::io;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use http::{HeaderMap, StatusCode};

use crate::message::Request;

/// Notification that the peer hung up before the response completed.
pub type PeerClosed = BoxFuture<'static, ()>;

/// Byte-oriented response sink exposed by the host.
///
/// Header state must reach the peer before body bytes, so `write_status`
/// and the header map are only meaningful until the first `write`.
pub trait ResponseWriter: Send {
    /// Record the response status code.
    fn write_status(&mut self, status: StatusCode);

    /// Mutable access to the response header collection.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Write a chunk of body bytes.
    fn write(&mut self, chunk: &[u8]) -> io::Result<usize>;

    /// Out-of-band peer-disconnect signal, when the host exposes one.
    ///
    /// The handle may only be taken once; the default is no signal.
    fn peer_closed(&mut self) -> Option<PeerClosed> {
        None
    }
}

/// A stage in the middleware chain.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request);
}

/// Adapts a plain closure into a [`Handler`].
pub struct HandlerFn<F>(pub F);

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync,
{
    async fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) {
        (self.0)(writer, request)
    }
}
