//! Short-range device link primitive.
//!
//! Abstracts over connection-oriented short-range radios (BLE-style) as an
//! opaque byte channel keyed by service/characteristic identifiers. The
//! combat engine owns no knowledge of the underlying radio protocol; it only
//! needs attribute-style reads and writes against a connected peer.
//!
//! Production builds plug in a real radio backend. Tests and single-device
//! operation use [`MemoryHub`], an in-process loopback that models the same
//! advertise/scan/connect lifecycle.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Errors from link operations.
///
/// None of these are fatal to the engine: callers surface them to the user
/// and fall back to local-only operation.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link has not been initialized")]
    Uninitialized,

    #[error("not connected to a peer")]
    NotConnected,

    #[error("peer {0} is not reachable")]
    PeerUnavailable(PeerId),

    #[error("scan failed: {0}")]
    ScanFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Identifier for a remote device (an address in whatever form the backing
/// radio uses).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connection-oriented short-range byte channel.
///
/// The trait models attribute-style links: a peer exposes values addressed
/// by (service, characteristic) pairs; `write` replaces a value and `read`
/// fetches the current one. There is no acknowledgement channel and no
/// notion of a request/response exchange; higher layers that need
/// confirmation must poll.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Prepare the local radio. Must be called before any other operation.
    async fn initialize(&self) -> Result<(), LinkError>;

    /// Discover reachable peers currently advertising.
    async fn scan(&self) -> Result<Vec<PeerId>, LinkError>;

    /// Establish a connection to a specific peer.
    async fn connect(&self, peer: &PeerId) -> Result<(), LinkError>;

    /// Tear down the current connection, if any.
    async fn disconnect(&self) -> Result<(), LinkError>;

    /// Replace the value of the addressed attribute.
    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        bytes: &[u8],
    ) -> Result<(), LinkError>;

    /// Fetch the current value of the addressed attribute.
    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, LinkError>;
}

// ============================================================================
// In-process loopback
// ============================================================================

struct HubState {
    cells: HashMap<(Uuid, Uuid), Vec<u8>>,
    advertising: HashSet<PeerId>,
}

/// Shared medium for [`MemoryLink`] endpoints.
///
/// One hub models one radio neighborhood: every endpoint created from the
/// same hub sees the same advertised peers and the same attribute cells.
pub struct MemoryHub {
    state: Mutex<HubState>,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HubState {
                cells: HashMap::new(),
                advertising: HashSet::new(),
            }),
        })
    }

    /// Create an endpoint for a device joining this hub.
    pub fn endpoint(self: &Arc<Self>, local: PeerId) -> MemoryLink {
        MemoryLink {
            hub: Arc::clone(self),
            local,
            initialized: Mutex::new(false),
            connected: Mutex::new(None),
        }
    }

    /// Overwrite an attribute cell directly, bypassing any endpoint.
    ///
    /// Test hook for injecting corrupt or foreign payloads.
    pub fn inject(&self, service: Uuid, characteristic: Uuid, bytes: Vec<u8>) {
        let mut state = self.state.lock().expect("hub lock poisoned");
        state.cells.insert((service, characteristic), bytes);
    }
}

/// In-process loopback transport.
///
/// Faithful to the short-range model: writes land in shared cells, reads
/// observe whatever value is current, and nothing is acknowledged.
pub struct MemoryLink {
    hub: Arc<MemoryHub>,
    local: PeerId,
    initialized: Mutex<bool>,
    connected: Mutex<Option<PeerId>>,
}

impl MemoryLink {
    pub fn local_id(&self) -> &PeerId {
        &self.local
    }

    /// Start or stop advertising this endpoint to scanners on the hub.
    pub fn set_advertising(&self, on: bool) {
        let mut state = self.hub.state.lock().expect("hub lock poisoned");
        if on {
            state.advertising.insert(self.local.clone());
        } else {
            state.advertising.remove(&self.local);
        }
    }

    fn ensure_initialized(&self) -> Result<(), LinkError> {
        if *self.initialized.lock().expect("link lock poisoned") {
            Ok(())
        } else {
            Err(LinkError::Uninitialized)
        }
    }
}

#[async_trait]
impl Transport for MemoryLink {
    async fn initialize(&self) -> Result<(), LinkError> {
        *self.initialized.lock().expect("link lock poisoned") = true;
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<PeerId>, LinkError> {
        self.ensure_initialized()?;
        let state = self.hub.state.lock().expect("hub lock poisoned");
        Ok(state
            .advertising
            .iter()
            .filter(|p| **p != self.local)
            .cloned()
            .collect())
    }

    async fn connect(&self, peer: &PeerId) -> Result<(), LinkError> {
        self.ensure_initialized()?;
        let state = self.hub.state.lock().expect("hub lock poisoned");
        if !state.advertising.contains(peer) {
            return Err(LinkError::PeerUnavailable(peer.clone()));
        }
        drop(state);
        *self.connected.lock().expect("link lock poisoned") = Some(peer.clone());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        *self.connected.lock().expect("link lock poisoned") = None;
        Ok(())
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        bytes: &[u8],
    ) -> Result<(), LinkError> {
        self.ensure_initialized()?;
        let mut state = self.hub.state.lock().expect("hub lock poisoned");
        state.cells.insert((service, characteristic), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, LinkError> {
        self.ensure_initialized()?;
        if self.connected.lock().expect("link lock poisoned").is_none() {
            return Err(LinkError::NotConnected);
        }
        let state = self.hub.state.lock().expect("hub lock poisoned");
        state
            .cells
            .get(&(service, characteristic))
            .cloned()
            .ok_or_else(|| LinkError::ReadFailed("attribute has no value".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVC: Uuid = Uuid::from_u128(0xd1ce);
    const CHR: Uuid = Uuid::from_u128(0xca7a);

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let hub = MemoryHub::new();
        let host = hub.endpoint(PeerId::new("host"));
        let follower = hub.endpoint(PeerId::new("follower"));

        host.initialize().await.unwrap();
        host.set_advertising(true);
        follower.initialize().await.unwrap();
        follower.connect(host.local_id()).await.unwrap();

        host.write(SVC, CHR, b"snapshot").await.unwrap();
        let bytes = follower.read(SVC, CHR).await.unwrap();
        assert_eq!(bytes, b"snapshot");
    }

    #[tokio::test]
    async fn operations_require_initialize() {
        let hub = MemoryHub::new();
        let link = hub.endpoint(PeerId::new("a"));
        assert!(matches!(
            link.scan().await,
            Err(LinkError::Uninitialized)
        ));
        assert!(matches!(
            link.write(SVC, CHR, b"x").await,
            Err(LinkError::Uninitialized)
        ));
    }

    #[tokio::test]
    async fn connect_requires_advertising_peer() {
        let hub = MemoryHub::new();
        let follower = hub.endpoint(PeerId::new("follower"));
        follower.initialize().await.unwrap();

        let ghost = PeerId::new("ghost");
        assert!(matches!(
            follower.connect(&ghost).await,
            Err(LinkError::PeerUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn read_requires_connection() {
        let hub = MemoryHub::new();
        let follower = hub.endpoint(PeerId::new("follower"));
        follower.initialize().await.unwrap();
        assert!(matches!(
            follower.read(SVC, CHR).await,
            Err(LinkError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn scan_lists_advertising_peers_only() {
        let hub = MemoryHub::new();
        let host = hub.endpoint(PeerId::new("host"));
        let other = hub.endpoint(PeerId::new("other"));
        let follower = hub.endpoint(PeerId::new("follower"));

        host.initialize().await.unwrap();
        other.initialize().await.unwrap();
        follower.initialize().await.unwrap();
        host.set_advertising(true);

        let peers = follower.scan().await.unwrap();
        assert_eq!(peers, vec![PeerId::new("host")]);
    }
}
