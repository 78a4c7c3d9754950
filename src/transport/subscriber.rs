use std::{collections::HashSet, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::StreamExt;
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use super::{codec, tcp_target};

/// Network subscription socket.
///
/// Funnels frames from any number of peer publish endpoints into a single
/// receiver. Each subscribed endpoint gets its own link task, which keeps
/// reconnecting after refusals and disconnects until the receiver is dropped.
#[derive(Clone)]
pub struct Subscriber {
    inbound: mpsc::UnboundedSender<Bytes>,
    endpoints: Arc<Mutex<HashSet<String>>>,
    reconnect_delay: Duration,
}

impl Subscriber {
    /// Creates a subscriber with no links, and the receiver its frames arrive on.
    pub fn new(reconnect_delay: Duration) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (inbound, inbound_rx) = mpsc::unbounded_channel();

        let subscriber = Self {
            inbound,
            endpoints: Arc::new(Mutex::new(HashSet::new())),
            reconnect_delay,
        };

        (subscriber, inbound_rx)
    }

    /// Subscribes to a peer's publish endpoint.
    ///
    /// Returns `false` without opening another link if the endpoint is
    /// already subscribed. The connection itself is established in the
    /// background; an unreachable peer is retried rather than reported.
    pub async fn connect(&self, endpoint: &str) -> bool {
        let mut endpoints = self.endpoints.lock().await;
        if !endpoints.insert(endpoint.to_string()) {
            debug!(endpoint, "Already subscribed");
            return false;
        }

        info!(endpoint, "Subscribing to peer");
        tokio::spawn(run_link(
            endpoint.to_string(),
            self.inbound.clone(),
            self.reconnect_delay,
        ));

        true
    }

    /// Endpoints this subscriber has links to, in no particular order.
    pub async fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().await.iter().cloned().collect()
    }
}

async fn run_link(endpoint: String, inbound: mpsc::UnboundedSender<Bytes>, delay: Duration) {
    loop {
        match TcpStream::connect(tcp_target(&endpoint)).await {
            Ok(stream) => {
                debug!(%endpoint, "Subscription link up");
                let mut frames = FramedRead::new(stream, codec());

                while let Some(frame) = frames.next().await {
                    match frame {
                        Ok(payload) => {
                            if inbound.send(payload.freeze()).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(%endpoint, error = %e, "Subscription link failed");
                            break;
                        }
                    }
                }

                debug!(%endpoint, "Subscription link down");
            }
            Err(e) => {
                debug!(%endpoint, error = %e, "Peer unreachable, retrying");
            }
        }

        if inbound.is_closed() {
            return;
        }

        tokio::time::sleep(delay).await;
    }
}
