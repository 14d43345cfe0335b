//! Error types surfaced by modifier operations.

use thiserror::Error;

/// Errors returned by body read, encode and decode operations.
///
/// Nothing here is fatal to the host. Every failure is a value returned to
/// the call site, and no operation retries on its own; callers own retry
/// decisions.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying body stream errored while being drained.
    #[error("failed to read message body")]
    Read(#[source] std::io::Error),

    /// A structured value could not be serialized as JSON.
    /// The message body is left unmodified.
    #[error("failed to encode JSON body")]
    EncodeJson(#[source] serde_json::Error),

    /// A structured value could not be serialized as XML.
    /// The message body is left unmodified.
    #[error("failed to encode XML body")]
    EncodeXml(#[source] quick_xml::SeError),

    /// A non-empty body could not be parsed as JSON.
    /// An empty body is not a decode error.
    #[error("failed to decode JSON body")]
    DecodeJson(#[source] serde_json::Error),

    /// A non-empty body could not be parsed as XML.
    /// An empty body is not a decode error.
    #[error("failed to decode XML body")]
    DecodeXml(#[source] quick_xml::DeError),
}
