//! One-way combat-state replication.
//!
//! Exactly one device is the host and owns the writable [`CombatTracker`];
//! any number of followers mirror it read-only. The host serializes the
//! full snapshot after every mutation and writes it to a fixed
//! service/characteristic address on the link; followers poll that address
//! on a timer and replace their local copy wholesale. Followers never
//! write back; this is deliberate last-snapshot-wins replication, not
//! consensus.
//!
//! Broadcasting is decoupled from the engine: mutations enqueue the
//! encoded snapshot on a channel and a writer task drains it to the link,
//! so a slow radio never blocks combat resolution.

use crate::participant::Participant;
use crate::tracker::{ActionOutcome, CombatError, CombatSnapshot, CombatTracker};
use crate::wire::{self, WireError};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;
use warband_link::{LinkError, PeerId, Transport};

/// Service the combat channel lives under.
pub const COMBAT_SERVICE: Uuid = Uuid::from_u128(0x7bb455d139c641ad9e5a68cf3e8a2f10);

/// Characteristic the serialized snapshot is written to and read from.
pub const SNAPSHOT_CHARACTERISTIC: Uuid = Uuid::from_u128(0x41c7a9235d8f4f6e8c3b9d2a7f1e6b44);

/// Errors from the sync layer. All of them degrade the session to
/// local-only operation; none terminate combat.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("link error: {0}")]
    Link(#[from] LinkError),

    #[error("combat error: {0}")]
    Combat(#[from] CombatError),

    #[error("broadcast channel closed")]
    ChannelClosed,
}

/// Follower-side tunables.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often a follower polls the snapshot characteristic.
    pub poll_interval: Duration,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Host side
// ============================================================================

/// Queue-and-drain snapshot writer.
///
/// `publish` never blocks: it encodes the snapshot and enqueues it; the
/// writer task pushes queued payloads to the link in order. Write failures
/// are logged and dropped; followers catch up from the next snapshot.
pub struct HostBroadcaster {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    task: JoinHandle<()>,
}

impl HostBroadcaster {
    pub fn start(transport: Arc<dyn Transport>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let task = tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                if let Err(error) = transport
                    .write(COMBAT_SERVICE, SNAPSHOT_CHARACTERISTIC, &bytes)
                    .await
                {
                    warn!(%error, "snapshot broadcast failed");
                }
            }
        });
        Self { tx, task }
    }

    pub fn publish(&self, snapshot: &CombatSnapshot) -> Result<(), SyncError> {
        let bytes = wire::encode(snapshot)?;
        self.tx.send(bytes).map_err(|_| SyncError::ChannelClosed)
    }

    /// Stop the writer after draining whatever is already queued.
    pub async fn shutdown(self) {
        let Self { tx, task } = self;
        drop(tx);
        let _ = task.await;
    }
}

/// The narrator's device: a combat tracker whose every mutation is
/// broadcast to followers.
///
/// The broadcast endpoint opens when combat begins and is torn down by
/// [`HostSession::end`]. If the link fails, operations keep succeeding
/// locally and the session degrades to host-only mode.
pub struct HostSession {
    tracker: CombatTracker,
    transport: Arc<dyn Transport>,
    broadcaster: Option<HostBroadcaster>,
}

impl HostSession {
    pub fn new(tracker: CombatTracker, transport: Arc<dyn Transport>) -> Self {
        Self {
            tracker,
            transport,
            broadcaster: None,
        }
    }

    pub fn tracker(&self) -> &CombatTracker {
        &self.tracker
    }

    /// Start combat and open the broadcast endpoint.
    pub async fn begin(&mut self, roster: &[Participant]) -> Result<ActionOutcome, SyncError> {
        self.begin_with_rng(roster, &mut rand::thread_rng()).await
    }

    pub async fn begin_with_rng<R: Rng>(
        &mut self,
        roster: &[Participant],
        rng: &mut R,
    ) -> Result<ActionOutcome, SyncError> {
        let outcome = self.tracker.start_combat_with_rng(roster, rng)?;
        if let Err(error) = self.transport.initialize().await {
            warn!(%error, "link setup failed, continuing host-only");
            return Ok(outcome);
        }
        let broadcaster = HostBroadcaster::start(Arc::clone(&self.transport));
        self.broadcaster = Some(broadcaster);
        self.broadcast_current();
        Ok(outcome)
    }

    /// Run one mutating operation against the tracker; on success the new
    /// snapshot is enqueued for broadcast.
    pub fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut CombatTracker) -> Result<T, CombatError>,
    ) -> Result<T, CombatError> {
        let result = op(&mut self.tracker);
        if result.is_ok() {
            self.broadcast_current();
        }
        result
    }

    /// Reset combat and tear the broadcast endpoint down.
    pub async fn end(&mut self) -> ActionOutcome {
        let outcome = self.tracker.reset();
        if let Some(broadcaster) = self.broadcaster.take() {
            broadcaster.shutdown().await;
        }
        outcome
    }

    fn broadcast_current(&self) {
        if let Some(broadcaster) = &self.broadcaster {
            if let Err(error) = broadcaster.publish(self.tracker.snapshot()) {
                warn!(%error, "failed to enqueue snapshot");
            }
        }
    }
}

// ============================================================================
// Follower side
// ============================================================================

/// A player's device: polls the host's snapshot characteristic and exposes
/// the latest successfully decoded copy.
///
/// Malformed payloads are discarded and logged; the prior snapshot is
/// retained. The poll task stops deterministically on
/// [`Follower::disconnect`].
pub struct Follower {
    snapshot_rx: watch::Receiver<Option<CombatSnapshot>>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    transport: Arc<dyn Transport>,
}

impl Follower {
    /// Connect to a host and start polling.
    pub async fn connect(
        transport: Arc<dyn Transport>,
        host: &PeerId,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        transport.initialize().await?;
        transport.connect(host).await?;

        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let poll_transport = Arc::clone(&transport);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        match poll_transport
                            .read(COMBAT_SERVICE, SNAPSHOT_CHARACTERISTIC)
                            .await
                        {
                            Ok(bytes) => match wire::decode(&bytes) {
                                Ok(snapshot) => {
                                    let _ = snapshot_tx.send(Some(snapshot));
                                }
                                Err(error) => {
                                    warn!(%error, "discarding malformed snapshot payload");
                                }
                            },
                            Err(error) => {
                                debug!(%error, "snapshot poll failed");
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            snapshot_rx,
            shutdown: shutdown_tx,
            task,
            transport,
        })
    }

    /// The latest successfully replicated snapshot, if any has arrived.
    pub fn snapshot(&self) -> Option<CombatSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to snapshot replacements.
    pub fn watch(&self) -> watch::Receiver<Option<CombatSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// Stop the poll loop and drop the connection.
    pub async fn disconnect(self) -> Result<(), SyncError> {
        let Self {
            shutdown,
            task,
            transport,
            ..
        } = self;
        let _ = shutdown.send(());
        let _ = task.await;
        transport.disconnect().await?;
        Ok(())
    }
}
