// ═══════════════════════════════════════════════════════════════════════
// Outbound notifications
//
// The coordinator hands every engine notice to a Notifier after the game
// record has been saved. RoomChannels keeps one broadcast channel per
// room; the connection layer subscribes and filters on `recipients`.
// ═══════════════════════════════════════════════════════════════════════

use nightfall_engine::{Notice, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

pub trait Notifier: Send + Sync {
    fn deliver(&self, room: &str, notice: &Notice);

    /// The room is gone; release whatever was kept for it.
    fn close(&self, _room: &str) {}
}

/// A notice addressed to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub room: String,
    /// None = everyone in the room.
    pub recipients: Option<Vec<PlayerId>>,
    #[serde(flatten)]
    pub notice: Notice,
}

impl Envelope {
    pub fn new(room: &str, notice: Notice) -> Self {
        Envelope { room: room.to_string(), recipients: notice.recipients(), notice }
    }

    pub fn is_for(&self, player: PlayerId) -> bool {
        self.recipients.as_ref().map_or(true, |r| r.contains(&player))
    }

    /// Wire form, tagged by `message_type`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub struct RoomChannels {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
}

impl RoomChannels {
    pub fn new(capacity: usize) -> Self {
        RoomChannels { capacity: capacity.max(1), channels: Mutex::new(HashMap::new()) }
    }

    fn sender(&self, room: &str) -> Option<broadcast::Sender<Envelope>> {
        let mut channels = self.channels.lock().ok()?;
        let tx = channels
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Some(tx.clone())
    }

    pub fn subscribe(&self, room: &str) -> Option<broadcast::Receiver<Envelope>> {
        self.sender(room).map(|tx| tx.subscribe())
    }
}

impl Notifier for RoomChannels {
    fn deliver(&self, room: &str, notice: &Notice) {
        let Some(tx) = self.sender(room) else {
            tracing::warn!(room, "notification channels lock poisoned; notice dropped");
            return;
        };
        if tx.send(Envelope::new(room, notice.clone())).is_err() {
            // No subscribers - this is normal, not an error
            tracing::debug!(room, "no subscribers for notice");
        }
    }

    /// Drop the room's channel. Subscribers see the channel close.
    fn close(&self, room: &str) {
        if let Ok(mut channels) = self.channels.lock() {
            channels.remove(room);
        }
    }
}

/// Discards everything. For headless runs.
pub struct Silent;

impl Notifier for Silent {
    fn deliver(&self, _room: &str, _notice: &Notice) {}
}
