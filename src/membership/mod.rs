//! Mesh membership through join handshakes.
//!
//! The server role answers `connect` requests: it subscribes to the joiner's
//! publish endpoint, replies with its own publish endpoint and the peers it
//! already knows, and records the joiner. The client role runs once at
//! startup against a bootstrap peer and links back to it.
//!
//! By default a joiner links only to its bootstrap target, so connectivity
//! is one hop. With transitive joining the joiner repeats the handshake with
//! every peer it learns about. Peers are never removed.

mod messages;
mod view;


pub use messages::{JoinReply, JoinRequest, PeerAddress};
pub use view::MembershipView;

use std::{
    collections::{HashSet, VecDeque},
    time::Duration,
};

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::{
    Result,
    transport::{self, RequestEndpoint, Subscriber, tcp_target},
};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Server side of the join handshake.
pub struct MembershipService {
    own: PeerAddress,
    view: MembershipView,
    subscriber: Subscriber,
    endpoint: RequestEndpoint,
}

/// What a node learned from joining the mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Publish endpoint of the bootstrap target.
    pub bootstrap_pub: String,
    /// Request endpoints reported by the peers that were joined, in the
    /// order they were learned.
    pub clients: Vec<String>,
}

impl MembershipService {
    /// Creates the service for a node reachable at `own`.
    pub fn new(own: PeerAddress, endpoint: RequestEndpoint, subscriber: Subscriber) -> Self {
        Self {
            own,
            view: MembershipView::new(),
            subscriber,
            endpoint,
        }
    }

    /// Read handle on the membership this service maintains.
    pub fn view(&self) -> MembershipView {
        self.view.clone()
    }

    /// Serves join requests one at a time, forever.
    pub async fn run(self) {
        loop {
            let mut exchange = match self.endpoint.accept().await {
                Ok(exchange) => exchange,
                Err(e) => {
                    warn!(error = %e, "Failed to accept join request");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let peer = exchange.peer();

            let request = match exchange.receive().await.and_then(|p| JoinRequest::from_wire(&p)) {
                Ok(request) => request,
                Err(e) => {
                    warn!(%peer, error = %e, "Dropped join request");
                    continue;
                }
            };

            let JoinRequest::Connect {
                pub_address,
                rep_address,
            } = request;

            let reply = self.accept_join(&pub_address).await;
            let sent = match reply.to_wire() {
                Ok(payload) => exchange.reply(Bytes::from(payload)).await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                warn!(%peer, error = %e, "Failed to send join reply");
            }

            info!(%rep_address, %pub_address, "Peer joined");
            self.view.append(rep_address);
        }
    }

    /// Links to a joining peer and builds the reply for it.
    ///
    /// The reply lists the membership as it was before this join.
    pub async fn accept_join(&self, pub_address: &str) -> JoinReply {
        let clients = self.view.snapshot();
        self.subscriber.connect(pub_address).await;

        JoinReply {
            pub_address: self.own.pub_address.clone(),
            clients,
        }
    }
}

/// Performs one join handshake with `target`.
///
/// # Errors
/// Returns `ConfsyncError::Transport` if the exchange fails and
/// `ConfsyncError::MalformedMessage` if the reply cannot be parsed.
pub async fn handshake(target: &str, own: &PeerAddress) -> Result<JoinReply> {
    let request = JoinRequest::connect(own).to_wire()?;
    let reply = transport::request(target, Bytes::from(request)).await?;
    JoinReply::from_wire(&reply)
}

/// Joins the mesh through `bootstrap` and links to it.
///
/// With `transitive` set, the handshake is repeated breadth-first with every
/// peer learned along the way, each at most once. Only the bootstrap
/// handshake must succeed; failures with learned peers are logged.
///
/// # Errors
/// Returns the error of the bootstrap handshake.
#[instrument(skip(own, subscriber), fields(node = %own.rep_address))]
pub async fn join(
    bootstrap: &str,
    own: &PeerAddress,
    subscriber: &Subscriber,
    transitive: bool,
) -> Result<JoinOutcome> {
    let reply = handshake(bootstrap, own).await?;
    subscriber.connect(&reply.pub_address).await;
    info!(peers = reply.clients.len(), "Joined mesh through bootstrap peer");

    let mut outcome = JoinOutcome {
        bootstrap_pub: reply.pub_address,
        clients: reply.clients,
    };

    if !transitive {
        return Ok(outcome);
    }

    let mut visited: HashSet<String> = [bootstrap, own.rep_address.as_str()]
        .into_iter()
        .map(|endpoint| tcp_target(endpoint).to_string())
        .collect();
    let mut pending: VecDeque<String> = outcome.clients.iter().cloned().collect();

    while let Some(target) = pending.pop_front() {
        if !visited.insert(tcp_target(&target).to_string()) {
            continue;
        }

        match handshake(&target, own).await {
            Ok(reply) => {
                debug!(%target, peers = reply.clients.len(), "Joined learned peer");
                subscriber.connect(&reply.pub_address).await;

                for client in reply.clients {
                    if tcp_target(&client) == tcp_target(&own.rep_address) {
                        continue;
                    }
                    if !outcome.clients.contains(&client) {
                        outcome.clients.push(client.clone());
                    }
                    pending.push_back(client);
                }
            }
            Err(e) => warn!(%target, error = %e, "Failed to join learned peer"),
        }
    }

    Ok(outcome)
}
