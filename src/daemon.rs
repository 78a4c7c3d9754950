use bytes::Bytes;
use tokio::{sync::mpsc, task::JoinError};
use tracing::{info, instrument};

use crate::{
    ConfsyncError, Result,
    broadcast::Broadcaster,
    config::Settings,
    membership::{self, JoinOutcome, MembershipService, MembershipView, PeerAddress},
    reconcile::Reconciler,
    store::LocalStore,
    transport::{LocalEndpoint, PublishEndpoint, RequestEndpoint, Subscriber, advertised},
    watcher::ChangeDetector,
};

/// One node of the sync mesh.
///
/// Construction binds every endpoint, so a node that exists can be reached.
/// [`join_mesh`](Self::join_mesh) runs the client side of the join handshake
/// and [`run`](Self::run) starts the long-running loops.
pub struct Daemon {
    settings: Settings,
    store: LocalStore,
    broadcaster: Broadcaster,
    subscriber: Subscriber,
    inbound: mpsc::UnboundedReceiver<Bytes>,
    publish: PublishEndpoint,
    local: LocalEndpoint,
    membership: MembershipService,
    address: PeerAddress,
    seeds: Option<JoinOutcome>,
    joined: bool,
}

impl Daemon {
    /// Opens the config file and binds all endpoints.
    ///
    /// # Errors
    /// Returns `ConfsyncError::ConfigIo` if the config file cannot be read and
    /// `ConfsyncError::Transport` if an endpoint cannot be bound.
    #[instrument(skip_all, fields(file = %settings.file.display()))]
    pub async fn bind(settings: Settings) -> Result<Self> {
        let store = LocalStore::open(&settings.file)?;
        let initial = store.read()?;
        info!(timestamp = initial.timestamp, "Loaded config file");

        let broadcaster = Broadcaster::with_max_payload(settings.max_snapshot_bytes);

        let publish =
            PublishEndpoint::bind(&format!("{}:{}", settings.bind_host, settings.publish_port))
                .await?;
        let requests =
            RequestEndpoint::bind(&format!("{}:{}", settings.bind_host, settings.request_port))
                .await?;
        let local = LocalEndpoint::bind(&settings.local_socket)?;

        let address = PeerAddress::new(
            advertised(&settings.advertise_host, publish.local_addr()),
            advertised(&settings.advertise_host, requests.local_addr()),
        );

        let (subscriber, inbound) = Subscriber::new(settings.reconnect_delay());
        let membership = MembershipService::new(address.clone(), requests, subscriber.clone());

        info!(
            pub_address = %address.pub_address,
            rep_address = %address.rep_address,
            local_socket = %local.path().display(),
            "Endpoints bound"
        );

        Ok(Self {
            settings,
            store,
            broadcaster,
            subscriber,
            inbound,
            publish,
            local,
            membership,
            address,
            seeds: None,
            joined: false,
        })
    }

    /// Where peers reach this node.
    pub fn address(&self) -> &PeerAddress {
        &self.address
    }

    /// Read handle on the peers that joined through this node.
    pub fn membership(&self) -> MembershipView {
        self.membership.view()
    }

    /// Handle for publishing and for observing the local channel in-process.
    pub fn broadcaster(&self) -> Broadcaster {
        self.broadcaster.clone()
    }

    /// What the bootstrap handshake returned, if one was performed.
    pub fn seed_peers(&self) -> Option<&JoinOutcome> {
        self.seeds.as_ref()
    }

    /// Joins the mesh through the configured bootstrap peer.
    ///
    /// Does nothing without a bootstrap peer or when already joined.
    ///
    /// # Errors
    /// Returns the bootstrap handshake error; the node cannot take part in
    /// an existing mesh without it.
    pub async fn join_mesh(&mut self) -> Result<Option<&JoinOutcome>> {
        if self.joined {
            return Ok(self.seeds.as_ref());
        }
        self.joined = true;

        let bootstrap = match self.settings.bootstrap.as_deref() {
            Some(bootstrap) if !bootstrap.trim().is_empty() => bootstrap.trim().to_string(),
            _ => {
                info!("No bootstrap peer, starting a new mesh");
                return Ok(None);
            }
        };

        let outcome = membership::join(
            &bootstrap,
            &self.address,
            &self.subscriber,
            self.settings.transitive_join,
        )
        .await?;

        self.seeds = Some(outcome);
        Ok(self.seeds.as_ref())
    }

    /// Runs the node until a loop fails.
    ///
    /// Joins the mesh first if that has not happened yet, then starts the
    /// publish endpoints, the membership server, the reconciler and the
    /// change detector, waits for the settle delay and publishes the local
    /// config once.
    ///
    /// # Errors
    /// Returns the first fatal error: a failed join, watch setup or
    /// reconciliation write, or a loop that stopped.
    pub async fn run(mut self) -> Result<()> {
        self.join_mesh().await?;

        let Daemon {
            settings,
            store,
            broadcaster,
            inbound,
            publish,
            local,
            membership,
            ..
        } = self;

        let network_feed = broadcaster.clone();
        tokio::spawn(publish.run(move || network_feed.subscribe_network()));
        let local_feed = broadcaster.clone();
        tokio::spawn(local.run(move || local_feed.subscribe_local()));

        let mut membership_task = tokio::spawn(membership.run());
        let mut reconciler_task =
            tokio::spawn(Reconciler::new(store.clone(), broadcaster.clone()).run(inbound));

        let detector = ChangeDetector::new(store.clone(), broadcaster.clone())?;
        let mut detector_task = tokio::spawn(detector.run());

        tokio::time::sleep(settings.settle_delay()).await;
        let initial = store.read()?;
        broadcaster.publish(&initial);
        info!(timestamp = initial.timestamp, "Published initial config");

        tokio::select! {
            result = &mut reconciler_task => match result {
                Ok(result) => result,
                Err(e) => Err(task_failed("reconciler", e)),
            },
            result = &mut detector_task => Err(ended("change detector", result)),
            result = &mut membership_task => Err(ended("membership", result)),
        }
    }
}

fn task_failed(task: &'static str, error: JoinError) -> ConfsyncError {
    ConfsyncError::TaskFailed {
        task,
        details: error.to_string(),
    }
}

fn ended(task: &'static str, result: std::result::Result<(), JoinError>) -> ConfsyncError {
    match result {
        Ok(()) => ConfsyncError::TaskFailed {
            task,
            details: "stopped unexpectedly".to_string(),
        },
        Err(e) => task_failed(task, e),
    }
}
