use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{info, instrument};

use super::{codec, tcp_target};
use crate::{ConfsyncError, Result};

/// Bound endpoint serving one request/reply exchange per connection.
pub struct RequestEndpoint {
    listener: TcpListener,
    local_addr: SocketAddr,
}

/// One accepted request/reply exchange.
pub struct Exchange {
    frames: Framed<TcpStream, LengthDelimitedCodec>,
    peer: SocketAddr,
}

impl RequestEndpoint {
    /// Binds the endpoint.
    ///
    /// # Errors
    /// Returns `ConfsyncError::Transport` if the address cannot be bound.
    #[instrument]
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ConfsyncError::transport(e, addr))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ConfsyncError::transport(e, addr))?;

        info!(%local_addr, "Request endpoint bound");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next requester.
    ///
    /// # Errors
    /// Returns `ConfsyncError::Transport` if accepting fails.
    pub async fn accept(&self) -> Result<Exchange> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| ConfsyncError::transport(e, self.local_addr.to_string()))?;

        Ok(Exchange {
            frames: Framed::new(stream, codec()),
            peer,
        })
    }
}

impl Exchange {
    /// Address of the requester.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Reads the request frame.
    ///
    /// # Errors
    /// Returns `ConfsyncError::Transport` if the requester hangs up before
    /// sending a full frame.
    pub async fn receive(&mut self) -> Result<Bytes> {
        match self.frames.next().await {
            Some(Ok(frame)) => Ok(frame.freeze()),
            Some(Err(e)) => Err(ConfsyncError::transport(e, self.peer.to_string())),
            None => Err(ConfsyncError::transport(
                "connection closed before request",
                self.peer.to_string(),
            )),
        }
    }

    /// Sends the reply frame and ends the exchange.
    ///
    /// # Errors
    /// Returns `ConfsyncError::Transport` if the reply cannot be sent.
    pub async fn reply(mut self, payload: Bytes) -> Result<()> {
        self.frames
            .send(payload)
            .await
            .map_err(|e| ConfsyncError::transport(e, self.peer.to_string()))
    }
}

/// Performs exactly one request/reply exchange with `endpoint`.
///
/// # Errors
/// Returns `ConfsyncError::Transport` if connecting, sending or receiving
/// fails, or if the peer closes without replying.
pub async fn request(endpoint: &str, payload: Bytes) -> Result<Bytes> {
    let stream = TcpStream::connect(tcp_target(endpoint))
        .await
        .map_err(|e| ConfsyncError::transport(e, endpoint))?;
    let mut frames = Framed::new(stream, codec());

    frames
        .send(payload)
        .await
        .map_err(|e| ConfsyncError::transport(e, endpoint))?;

    match frames.next().await {
        Some(Ok(frame)) => Ok(frame.freeze()),
        Some(Err(e)) => Err(ConfsyncError::transport(e, endpoint)),
        None => Err(ConfsyncError::transport("connection closed without reply", endpoint)),
    }
}
