//! Seams between the reconciliation core and the device layer
//!
//! The core only ever talks to zones through these traits. `SonosNetwork`
//! implements them against real players; the integration tests implement
//! them with recording fakes.

use std::fmt;
use std::sync::Arc;

pub use sonos_control::TransportState;

use crate::error::Result;
use crate::event_queue::EventQueue;
use crate::notification::Notification;
use crate::topology::{ZoneGroup, ZoneId};

/// Transport state and coordinator flag of one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatus {
    pub id: ZoneId,
    pub is_coordinator: bool,
    pub transport_state: TransportState,
}

impl ZoneStatus {
    /// A coordinator that is playing is what makes a grouping temporary
    pub fn is_playing_coordinator(&self) -> bool {
        self.is_coordinator && self.transport_state.is_playing()
    }
}

/// Query and command access to the zones
///
/// Calls are synchronous and are never retried by the core.
pub trait ZoneControl: Send + Sync {
    /// The live grouping of the household
    fn query_groups(&self) -> Result<Vec<ZoneGroup>>;

    /// Transport state and coordinator flag of every known zone
    fn zone_statuses(&self) -> Result<Vec<ZoneStatus>>;

    /// Make `zone` follow `coordinator`
    fn join(&self, zone: &str, coordinator: &str) -> Result<()>;

    /// Detach `zone` from whatever group it is in
    fn unjoin(&self, zone: &str) -> Result<()>;
}

/// Notification channels a zone offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Grouping changes, broadcast by every zone for the whole household
    Topology,
    /// Playback state and current track of one zone
    Transport,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Topology => f.write_str("topology"),
            Topic::Transport => f.write_str("transport"),
        }
    }
}

/// Identifies a live subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub id: String,
    pub topic: Topic,
    pub zone: ZoneId,
}

/// Delivers a zone's notifications into an [`EventQueue`]
pub trait NotificationSubscriber {
    /// Start pushing `topic` notifications of `zone` into `queue`, keyed by `zone`
    fn subscribe(
        &self,
        topic: Topic,
        zone: &str,
        queue: Arc<EventQueue<Notification>>,
    ) -> Result<SubscriptionHandle>;
}
