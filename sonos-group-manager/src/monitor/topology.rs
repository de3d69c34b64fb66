use std::sync::Arc;

use crate::error::{ManagerError, Result};
use crate::event_queue::EventQueue;
use crate::notification::Notification;
use crate::port::{NotificationSubscriber, Topic, ZoneControl};
use crate::topology::{Topology, ZoneId};

/// Full grouping snapshot taken when a topology notification arrived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEvent {
    pub topology: Topology,
    /// Some coordinator was playing when the snapshot was taken
    pub temporary: bool,
}

/// Watches grouping changes through a single zone
///
/// Topology notifications are broadcast household-wide, so one subscription
/// on a representative zone is enough. The notification body is ignored;
/// each arrival triggers a fresh query of the grouping and of every zone's
/// playing state.
pub struct TopologyMonitor {
    control: Arc<dyn ZoneControl>,
    queue: Arc<EventQueue<Notification>>,
}

impl TopologyMonitor {
    pub fn new(
        zones: &[ZoneId],
        control: Arc<dyn ZoneControl>,
        subscriber: &dyn NotificationSubscriber,
    ) -> Result<Self> {
        let queue = Arc::new(EventQueue::new(zones.iter().cloned()));
        let representative = queue
            .sources()
            .next()
            .cloned()
            .ok_or(ManagerError::NoZonesDiscovered)?;

        let subscription = subscriber.subscribe(Topic::Topology, &representative, Arc::clone(&queue))?;
        tracing::debug!(zone = %representative, sid = %subscription.id, "watching topology");

        Ok(Self { control, queue })
    }

    /// One snapshot per buffered notification
    ///
    /// A snapshot whose queries fail is logged and skipped.
    pub fn drain_events(&self) -> Vec<TopologyEvent> {
        self.queue
            .drain()
            .into_iter()
            .filter_map(|(source, _)| match self.snapshot() {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "topology query failed, event skipped");
                    None
                }
            })
            .collect()
    }

    /// Query the live grouping and tag it default/temporary
    pub fn snapshot(&self) -> Result<TopologyEvent> {
        let groups = self.control.query_groups()?;
        let topology = Topology::from_groups(&groups);
        let temporary = self.is_any_playing()?;
        Ok(TopologyEvent { topology, temporary })
    }

    /// True iff some coordinator zone is playing right now
    pub fn is_any_playing(&self) -> Result<bool> {
        Ok(self
            .control
            .zone_statuses()?
            .iter()
            .any(|status| status.is_playing_coordinator()))
    }
}
