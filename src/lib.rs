//! Transparent HTTP interception middleware.
//!
//! Lets a proxy-style middleware stage observe and rewrite a request before
//! it is forwarded, and a response before it is returned to the original
//! caller, without either peer seeing that interception occurred. The
//! response side buffers every handler write into an in-memory response,
//! runs a user-supplied modifier exactly once on the fully assembled
//! message, then emits status, headers and body to the real sink exactly
//! once.

pub mod body;
pub mod error;
pub mod message;
pub mod request;
pub mod response;
pub mod sink;

mod codec;

pub use body::Body;
pub use error::Error;
pub use message::{Request, RequestContext, Response};
pub use request::{request, Filter, RequestInterceptor, RequestModifier};
pub use response::{
    response, CloseHandle, ResponseInterceptor, ResponseModifier, WriterInterceptor,
};
pub use sink::{Handler, HandlerFn, PeerClosed, ResponseWriter};
