use serde::{Deserialize, Serialize};

use crate::{ConfsyncError, Result};

/// Where a peer can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress {
    /// Endpoint the peer broadcasts its snapshots on.
    pub pub_address: String,
    /// Endpoint the peer accepts join handshakes on.
    pub rep_address: String,
}

impl PeerAddress {
    /// Creates a peer address from its two endpoints.
    pub fn new(pub_address: impl Into<String>, rep_address: impl Into<String>) -> Self {
        Self {
            pub_address: pub_address.into(),
            rep_address: rep_address.into(),
        }
    }
}

/// Handshake request sent by a joining node.
///
/// Tagged by its `Type` field; any other type fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "lowercase")]
pub enum JoinRequest {
    /// Ask the receiver to link with the sender.
    Connect {
        /// Sender's publish endpoint
        #[serde(rename = "PubAddress")]
        pub_address: String,
        /// Sender's request endpoint
        #[serde(rename = "RepAddress")]
        rep_address: String,
    },
}

/// Handshake reply from the node being joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReply {
    /// Replying node's publish endpoint.
    #[serde(rename = "PubAddress")]
    pub pub_address: String,
    /// Request endpoints the replying node knew of before this join.
    #[serde(rename = "Clients")]
    pub clients: Vec<String>,
}

impl JoinRequest {
    /// Builds a connect request announcing `own`.
    pub fn connect(own: &PeerAddress) -> Self {
        JoinRequest::Connect {
            pub_address: own.pub_address.clone(),
            rep_address: own.rep_address.clone(),
        }
    }

    /// Serializes the request into its wire form.
    ///
    /// # Errors
    /// Returns `ConfsyncError::MalformedMessage` if serialization fails.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ConfsyncError::malformed("join request", e))
    }

    /// Parses a request from its wire form.
    ///
    /// # Errors
    /// Returns `ConfsyncError::MalformedMessage` for unparseable payloads and
    /// unknown request types.
    pub fn from_wire(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| ConfsyncError::malformed("join request", e))
    }
}

impl JoinReply {
    /// Serializes the reply into its wire form.
    ///
    /// # Errors
    /// Returns `ConfsyncError::MalformedMessage` if serialization fails.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ConfsyncError::malformed("join reply", e))
    }

    /// Parses a reply from its wire form.
    ///
    /// # Errors
    /// Returns `ConfsyncError::MalformedMessage` if the payload is not a reply.
    pub fn from_wire(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| ConfsyncError::malformed("join reply", e))
    }
}
