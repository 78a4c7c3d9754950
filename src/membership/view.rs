use std::fmt::{self, Debug};

use futures::stream::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Request endpoints of every peer that has joined through this node.
///
/// Append-only and in join order, without deduplication. Only the
/// membership server appends; everyone else reads copies, either the current
/// one through [`snapshot`](Self::snapshot) or successive ones through
/// [`watch`](Self::watch).
#[derive(Clone)]
pub struct MembershipView {
    tx: watch::Sender<Vec<String>>,
    rx: watch::Receiver<Vec<String>>,
}

impl Default for MembershipView {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipView {
    /// Creates an empty view.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        Self { tx, rx }
    }

    /// Appends a joined peer's request endpoint and notifies watchers.
    pub(crate) fn append(&self, rep_address: String) {
        self.tx.send_modify(|members| members.push(rep_address));
    }

    /// Copy of the current membership.
    pub fn snapshot(&self) -> Vec<String> {
        self.rx.borrow().clone()
    }

    /// Number of joins recorded so far.
    pub fn len(&self) -> usize {
        self.rx.borrow().len()
    }

    /// Whether no peer has joined yet.
    pub fn is_empty(&self) -> bool {
        self.rx.borrow().is_empty()
    }

    /// Stream of membership copies.
    ///
    /// Yields the current membership immediately, then again after every
    /// append.
    pub fn watch(&self) -> impl Stream<Item = Vec<String>> + Send {
        WatchStream::new(self.rx.clone())
    }
}

impl Debug for MembershipView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipView")
            .field("members", &self.snapshot())
            .finish()
    }
}
