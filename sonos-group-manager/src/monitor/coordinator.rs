use std::sync::Arc;

use crate::error::Result;
use crate::event_queue::EventQueue;
use crate::notification::Notification;
use crate::port::{NotificationSubscriber, Topic};
use crate::topology::ZoneId;

/// Playback change reported by one zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorEvent {
    pub source: ZoneId,
    pub playing: bool,
    pub track: String,
}

impl CoordinatorEvent {
    /// Requires both `transport_state` and `current_track_uri`
    pub fn from_notification(source: ZoneId, notification: &Notification) -> Option<Self> {
        let state = notification.transport_state()?;
        let track = notification.current_track_uri()?;
        Some(Self {
            playing: state == "PLAYING",
            track: track.to_string(),
            source,
        })
    }
}

/// Watches the transport channel of every zone
pub struct CoordinatorMonitor {
    queue: Arc<EventQueue<Notification>>,
}

impl CoordinatorMonitor {
    pub fn new(zones: &[ZoneId], subscriber: &dyn NotificationSubscriber) -> Result<Self> {
        let queue = Arc::new(EventQueue::new(zones.iter().cloned()));

        for zone in queue.sources() {
            let subscription = subscriber.subscribe(Topic::Transport, zone, Arc::clone(&queue))?;
            tracing::debug!(zone = %zone, sid = %subscription.id, "watching transport");
        }

        Ok(Self { queue })
    }

    /// Notifications lacking either transport field are dropped
    pub fn drain_events(&self) -> Vec<CoordinatorEvent> {
        self.queue
            .drain()
            .into_iter()
            .filter_map(|(source, notification)| {
                tracing::debug!(zone = %source, variables = ?notification.variables(), "transport event");
                let event = CoordinatorEvent::from_notification(source, &notification);
                if event.is_none() {
                    tracing::trace!("transport event without state or track ignored");
                }
                event
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_needs_state_and_track() {
        let complete = Notification::new()
            .with("transport_state", "PAUSED_PLAYBACK")
            .with("current_track_uri", "x-file-cifs://nas/song.flac");
        let event = CoordinatorEvent::from_notification("10.0.0.1".to_string(), &complete).unwrap();
        assert!(!event.playing);
        assert_eq!(event.track, "x-file-cifs://nas/song.flac");

        let no_track = Notification::new().with("transport_state", "PLAYING");
        assert!(CoordinatorEvent::from_notification("10.0.0.1".to_string(), &no_track).is_none());

        let no_state = Notification::new().with("current_track_uri", "");
        assert!(CoordinatorEvent::from_notification("10.0.0.1".to_string(), &no_state).is_none());
    }

    #[test]
    fn test_only_exact_playing_counts() {
        let transitioning = Notification::new()
            .with("transport_state", "TRANSITIONING")
            .with("current_track_uri", "");
        let event = CoordinatorEvent::from_notification("10.0.0.1".to_string(), &transitioning).unwrap();
        assert!(!event.playing);
    }
}
