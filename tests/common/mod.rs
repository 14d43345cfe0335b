//! Shared utilities for the interception integration tests.

use std::io;

use http::{HeaderMap, StatusCode};
use http_intercept::{PeerClosed, ResponseWriter};
use tokio::sync::oneshot;

/// In-memory stand-in for the host's real response sink. Records the
/// status, headers and every body write, and can expose a oneshot-backed
/// peer-disconnect signal.
pub struct MockWriter {
    pub status: Option<StatusCode>,
    pub status_writes: usize,
    pub headers: HeaderMap,
    pub writes: Vec<Vec<u8>>,
    peer_closed: Option<PeerClosed>,
}

impl MockWriter {
    pub fn new() -> MockWriter {
        MockWriter {
            status: None,
            status_writes: 0,
            headers: HeaderMap::new(),
            writes: Vec::new(),
            peer_closed: None,
        }
    }

    /// A sink whose peer can be disconnected by firing the returned sender.
    #[allow(dead_code)]
    pub fn with_peer_signal() -> (MockWriter, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let mut writer = MockWriter::new();
        writer.peer_closed = Some(Box::pin(async move {
            let _ = rx.await;
        }));
        (writer, tx)
    }

    /// All body bytes received so far, concatenated.
    pub fn body(&self) -> Vec<u8> {
        self.writes.concat()
    }
}

/// One sink call, in arrival order.
#[derive(Debug, PartialEq)]
pub enum SinkEvent {
    Status(StatusCode),
    Headers,
    Body(Vec<u8>),
}

/// Mock sink that records every call as a single ordered event log, so
/// tests can assert that the status and header phase reach the sink
/// strictly before the first body byte.
pub struct SequencedWriter {
    pub events: Vec<SinkEvent>,
    headers: HeaderMap,
}

impl SequencedWriter {
    pub fn new() -> SequencedWriter {
        SequencedWriter {
            events: Vec::new(),
            headers: HeaderMap::new(),
        }
    }
}

impl ResponseWriter for SequencedWriter {
    fn write_status(&mut self, status: StatusCode) {
        self.events.push(SinkEvent::Status(status));
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.events.push(SinkEvent::Headers);
        &mut self.headers
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<usize> {
        self.events.push(SinkEvent::Body(chunk.to_vec()));
        Ok(chunk.len())
    }
}

impl ResponseWriter for MockWriter {
    fn write_status(&mut self, status: StatusCode) {
        self.status = Some(status);
        self.status_writes += 1;
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<usize> {
        self.writes.push(chunk.to_vec());
        Ok(chunk.len())
    }

    fn peer_closed(&mut self) -> Option<PeerClosed> {
        self.peer_closed.take()
    }
}
