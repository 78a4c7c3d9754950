use std::{
    fs,
    io::ErrorKind,
    net::SocketAddr,
    os::unix::fs::FileTypeExt,
    path::{Path, PathBuf},
    time::Duration,
};

use bytes::Bytes;
use futures::SinkExt;
use tokio::{
    io::AsyncWrite,
    net::{TcpListener, UnixListener},
    sync::broadcast::{self, error::RecvError},
};
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, instrument, trace, warn};

use super::codec;
use crate::{ConfsyncError, Result};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bound TCP endpoint that streams a broadcast feed to every connected peer.
///
/// A peer receives only what is published after it connected.
pub struct PublishEndpoint {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl PublishEndpoint {
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

        info!(%local_addr, "Publish endpoint bound");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts subscribers forever, giving each a fresh feed from `subscribe`.
    pub async fn run<F>(self, subscribe: F)
    where
        F: Fn() -> broadcast::Receiver<Bytes>,
    {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "Subscriber connected");
                    let _ = stream.set_nodelay(true);
                    tokio::spawn(stream_feed(stream, subscribe(), peer.to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to accept subscriber");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

/// Bound Unix socket that streams raw config bodies to same-host consumers.
pub struct LocalEndpoint {
    listener: UnixListener,
    path: PathBuf,
}

impl LocalEndpoint {
    /// Binds the socket, replacing a stale socket file left by a previous run.
    ///
    /// Only a socket nobody answers on is replaced. Any other file at `path`
    /// is left alone.
    ///
    /// # Errors
    /// Returns `ConfsyncError::Transport` if `path` holds something other
    /// than a socket, if another process is serving on it, or if the socket
    /// cannot be bound.
    #[instrument]
    pub fn bind(path: &Path) -> Result<Self> {
        let endpoint = path.display().to_string();

        match fs::symlink_metadata(path) {
            Ok(metadata) if !metadata.file_type().is_socket() => {
                return Err(ConfsyncError::transport(
                    "path exists and is not a socket",
                    &endpoint,
                ));
            }
            Ok(_) => {
                if std::os::unix::net::UnixStream::connect(path).is_ok() {
                    return Err(ConfsyncError::transport(
                        "socket is in use by another process",
                        &endpoint,
                    ));
                }
                debug!(path = %endpoint, "Removing stale socket");
                fs::remove_file(path).map_err(|e| ConfsyncError::transport(e, &endpoint))?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ConfsyncError::transport(e, &endpoint)),
        }

        let listener =
            UnixListener::bind(path).map_err(|e| ConfsyncError::transport(e, &endpoint))?;

        info!(path = %endpoint, "Local endpoint bound");
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    /// Path of the bound socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts local consumers forever, giving each a fresh feed from `subscribe`.
    pub async fn run<F>(self, subscribe: F)
    where
        F: Fn() -> broadcast::Receiver<Bytes>,
    {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    debug!(path = %self.path.display(), "Local consumer connected");
                    tokio::spawn(stream_feed(stream, subscribe(), "local".to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to accept local consumer");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

async fn stream_feed<W>(writer: W, mut feed: broadcast::Receiver<Bytes>, peer: String)
where
    W: AsyncWrite + Unpin,
{
    let mut frames = FramedWrite::new(writer, codec());

    loop {
        match feed.recv().await {
            Ok(payload) => {
                if let Err(e) = frames.send(payload).await {
                    debug!(%peer, error = %e, "Subscriber went away");
                    return;
                }
                trace!(%peer, "Frame delivered");
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(%peer, missed, "Subscriber lagged, frames dropped");
            }
            Err(RecvError::Closed) => return,
        }
    }
}
