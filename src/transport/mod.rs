//! Publish/subscribe and request/reply plumbing between nodes.
//!
//! Every message travels as one length-delimited frame. The network channel
//! and the request endpoint run over TCP; the local channel runs over a Unix
//! socket. Delivery is ordered per link and best-effort overall.

mod publisher;
mod request;
mod subscriber;


pub use publisher::{LocalEndpoint, PublishEndpoint};
pub use request::{Exchange, RequestEndpoint, request};
pub use subscriber::Subscriber;

use std::net::SocketAddr;

use tokio_util::codec::LengthDelimitedCodec;

const TCP_SCHEME: &str = "tcp://";

/// Largest frame any endpoint sends or accepts.
///
/// This is the most a 4-byte length prefix can describe. Payloads above it
/// must be rejected before they reach an endpoint.
pub const MAX_FRAME_LENGTH: usize = u32::MAX as usize;

/// Strips an optional `tcp://` scheme from an endpoint string.
///
/// Peers may advertise endpoints either as `host:port` or `tcp://host:port`.
pub fn tcp_target(endpoint: &str) -> &str {
    endpoint.strip_prefix(TCP_SCHEME).unwrap_or(endpoint)
}

/// Formats the endpoint peers should use to reach a bound socket.
pub fn advertised(host: &str, bound: SocketAddr) -> String {
    format!("{host}:{}", bound.port())
}

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec()
}
