//! Recording fakes for the device ports and a small poll harness

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sonos_control::{ControlError, SoapError};
use sonos_group_manager::{
    EventQueue, GroupManager, GroupManagerConfig, ManagerError, Notification,
    NotificationSubscriber, Result, SubscriptionHandle, Topic, Topology, TransportState,
    ZoneControl, ZoneGroup, ZoneId, ZoneStatus,
};

pub const PASSTHROUGH_TRACK: &str = "x-sonos-htastream:RINCON_5CAAFD0A251401400:spdif";
pub const MUSIC_TRACK: &str = "x-sonos-spotify:spotify%3atrack%3a4uLU6hMCjMI75M1A2tKUQC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Unjoin(String),
    Join { zone: String, coordinator: String },
}

pub fn join(zone: &str, coordinator: &str) -> Call {
    Call::Join {
        zone: zone.to_string(),
        coordinator: coordinator.to_string(),
    }
}

pub fn unjoin(zone: &str) -> Call {
    Call::Unjoin(zone.to_string())
}

fn device_fault() -> ManagerError {
    ManagerError::Control(ControlError::Soap(SoapError::Fault(701)))
}

#[derive(Default)]
struct FakeState {
    groups: Vec<ZoneGroup>,
    playing: BTreeSet<String>,
    calls: Vec<Call>,
    fail_joins: bool,
    fail_group_queries: bool,
    fail_status_queries: bool,
}

/// Scripted household that records every group command
///
/// Commands do not change the scripted grouping; tests set it explicitly.
#[derive(Default)]
pub struct FakeControl {
    state: Mutex<FakeState>,
}

impl FakeControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_groups(&self, groups: &[(&str, &[&str])]) {
        self.state.lock().groups = groups
            .iter()
            .map(|(coordinator, members)| ZoneGroup::new(*coordinator, members.iter().copied()))
            .collect();
    }

    /// Mark a zone's transport as PLAYING (or STOPPED)
    pub fn set_playing(&self, zone: &str, playing: bool) {
        let mut state = self.state.lock();
        if playing {
            state.playing.insert(zone.to_string());
        } else {
            state.playing.remove(zone);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn fail_joins(&self, fail: bool) {
        self.state.lock().fail_joins = fail;
    }

    pub fn fail_group_queries(&self, fail: bool) {
        self.state.lock().fail_group_queries = fail;
    }

    pub fn fail_status_queries(&self, fail: bool) {
        self.state.lock().fail_status_queries = fail;
    }
}

impl ZoneControl for FakeControl {
    fn query_groups(&self) -> Result<Vec<ZoneGroup>> {
        let state = self.state.lock();
        if state.fail_group_queries {
            return Err(device_fault());
        }
        Ok(state.groups.clone())
    }

    fn zone_statuses(&self) -> Result<Vec<ZoneStatus>> {
        let state = self.state.lock();
        if state.fail_status_queries {
            return Err(device_fault());
        }
        Ok(state
            .groups
            .iter()
            .flat_map(|group| {
                group.members.iter().map(|member| ZoneStatus {
                    id: member.clone(),
                    is_coordinator: *member == group.coordinator,
                    transport_state: if state.playing.contains(member) {
                        TransportState::Playing
                    } else {
                        TransportState::Stopped
                    },
                })
            })
            .collect())
    }

    fn join(&self, zone: &str, coordinator: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(join(zone, coordinator));
        if state.fail_joins {
            return Err(device_fault());
        }
        Ok(())
    }

    fn unjoin(&self, zone: &str) -> Result<()> {
        self.state.lock().calls.push(unjoin(zone));
        Ok(())
    }
}

/// Keeps every queue handed to it so tests can play the transport's part
#[derive(Default)]
pub struct RecordingSubscriber {
    subscriptions: Mutex<Vec<(Topic, ZoneId, Arc<EventQueue<Notification>>)>>,
}

impl RecordingSubscriber {
    pub fn count(&self, topic: Topic) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|(t, _, _)| *t == topic)
            .count()
    }

    pub fn zones(&self, topic: Topic) -> Vec<ZoneId> {
        self.subscriptions
            .lock()
            .iter()
            .filter(|(t, _, _)| *t == topic)
            .map(|(_, zone, _)| zone.clone())
            .collect()
    }

    /// Deliver a notification as the transport would
    pub fn deliver(&self, topic: Topic, zone: &str, notification: Notification) -> bool {
        let subscriptions = self.subscriptions.lock();
        let (_, _, queue) = subscriptions
            .iter()
            .find(|(t, z, _)| *t == topic && z == zone)
            .unwrap_or_else(|| panic!("no {} subscription for {}", topic, zone));
        queue.enqueue(zone, notification)
    }
}

impl NotificationSubscriber for RecordingSubscriber {
    fn subscribe(
        &self,
        topic: Topic,
        zone: &str,
        queue: Arc<EventQueue<Notification>>,
    ) -> Result<SubscriptionHandle> {
        self.subscriptions
            .lock()
            .push((topic, zone.to_string(), queue));
        Ok(SubscriptionHandle {
            id: format!("uuid:RINCON_{}-{}", zone, topic),
            topic,
            zone: zone.to_string(),
        })
    }
}

pub fn transport(state: &str, track: &str) -> Notification {
    Notification::new()
        .with("transport_state", state)
        .with("current_track_uri", track)
}

pub fn topology(groups: &[(&str, &[&str])]) -> Topology {
    Topology::from_groups(
        &groups
            .iter()
            .map(|(coordinator, members)| ZoneGroup::new(*coordinator, members.iter().copied()))
            .collect::<Vec<_>>(),
    )
}

/// A manager wired to the fakes, driven with explicit instants
pub struct Harness {
    pub control: Arc<FakeControl>,
    pub subscriber: RecordingSubscriber,
    pub manager: GroupManager,
    start: Instant,
}

impl Harness {
    pub fn new(zones: &[&str]) -> Self {
        Self::with_config(zones, GroupManagerConfig::default())
    }

    pub fn with_config(zones: &[&str], config: GroupManagerConfig) -> Self {
        let control = FakeControl::new();
        let subscriber = RecordingSubscriber::default();
        let zones: Vec<ZoneId> = zones.iter().map(|z| z.to_string()).collect();

        let manager = GroupManager::new(&zones, &config, control.clone(), &subscriber)
            .expect("manager should start against fakes");

        Self {
            control,
            subscriber,
            manager,
            start: Instant::now(),
        }
    }

    pub fn at(&self, secs: u64) -> Instant {
        self.start + Duration::from_secs(secs)
    }

    /// Signal a grouping change through the topology subscription
    pub fn topology_changed(&self) {
        let zone = self.subscriber.zones(Topic::Topology)[0].clone();
        assert!(self
            .subscriber
            .deliver(Topic::Topology, &zone, Notification::new()));
    }

    pub fn transport(&self, zone: &str, state: &str, track: &str) {
        assert!(self
            .subscriber
            .deliver(Topic::Transport, zone, transport(state, track)));
    }

    pub fn poll(&mut self, secs: u64) {
        let now = self.at(secs);
        self.manager.poll_at(now);
    }
}
