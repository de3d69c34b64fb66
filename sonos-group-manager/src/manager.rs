//! Revert state machine
//!
//! The manager remembers the default grouping (observed while nothing was
//! playing) and the latest temporary one (observed while some coordinator
//! was playing). When playback stops on a diverged household it arms a
//! single revert deadline; once it passes and everything is still idle, the
//! default grouping is pushed back onto the devices.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::applier::TopologyApplier;
use crate::config::GroupManagerConfig;
use crate::error::Result;
use crate::monitor::{CoordinatorEvent, CoordinatorMonitor, TopologyMonitor};
use crate::playbar::PlaybarManager;
use crate::port::{NotificationSubscriber, ZoneControl};
use crate::topology::{Topology, ZoneId};

/// Where the household stands relative to its default grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// No divergence, or not enough known to tell
    Stable,
    /// Default and temporary groupings differ, nothing scheduled
    Diverged,
    /// A revert deadline is outstanding
    RevertArmed,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerState::Stable => f.write_str("stable"),
            ManagerState::Diverged => f.write_str("diverged"),
            ManagerState::RevertArmed => f.write_str("revert armed"),
        }
    }
}

pub struct GroupManager {
    revert_delay: Duration,
    playbar_rejoin: bool,
    topology_monitor: TopologyMonitor,
    coordinator_monitor: CoordinatorMonitor,
    playbar: PlaybarManager,
    applier: TopologyApplier,
    default_topology: Option<Topology>,
    temp_topology: Option<Topology>,
    revert_deadline: Option<Instant>,
}

impl GroupManager {
    /// Subscribe to every zone and start with nothing known
    pub fn new(
        zones: &[ZoneId],
        config: &GroupManagerConfig,
        control: Arc<dyn ZoneControl>,
        subscriber: &dyn NotificationSubscriber,
    ) -> Result<Self> {
        let topology_monitor = TopologyMonitor::new(zones, Arc::clone(&control), subscriber)?;
        let coordinator_monitor = CoordinatorMonitor::new(zones, subscriber)?;

        Ok(Self {
            revert_delay: config.revert_delay,
            playbar_rejoin: config.playbar_rejoin_group_on_play,
            topology_monitor,
            coordinator_monitor,
            playbar: PlaybarManager::new(Arc::clone(&control), None),
            applier: TopologyApplier::new(control),
            default_topology: None,
            temp_topology: None,
            revert_deadline: None,
        })
    }

    /// One tick at the current time
    pub fn poll(&mut self) {
        self.poll_at(Instant::now());
    }

    /// One tick: topology events, then transport events, then the deadline
    pub fn poll_at(&mut self, now: Instant) {
        self.poll_topology_events();
        self.poll_coordinator_events(now);
        self.poll_revert_deadline(now);
    }

    fn poll_topology_events(&mut self) {
        for event in self.topology_monitor.drain_events() {
            if event.temporary {
                tracing::info!(topology = %event.topology, "TEMP");
                self.temp_topology = Some(event.topology);
            } else {
                tracing::info!(topology = %event.topology, "PERM");
                self.playbar.set_topology(event.topology.clone());
                self.default_topology = Some(event.topology);
            }
        }
    }

    fn poll_coordinator_events(&mut self, now: Instant) {
        for event in self.coordinator_monitor.drain_events() {
            self.handle_coordinator_event(event, now);
        }
    }

    fn handle_coordinator_event(&mut self, event: CoordinatorEvent, now: Instant) {
        if !event.playing {
            if self.is_diverged() && self.revert_deadline.is_none() {
                match now.checked_add(self.revert_delay) {
                    Some(deadline) => {
                        tracing::info!(
                            delay_secs = self.revert_delay.as_secs(),
                            zone = %event.source,
                            "Starting revert timer"
                        );
                        self.revert_deadline = Some(deadline);
                    }
                    None => tracing::warn!(
                        delay_secs = self.revert_delay.as_secs(),
                        "Revert delay out of range, revert not scheduled"
                    ),
                }
            }

            if self.playbar_rejoin {
                self.playbar.stopped(&event.source);
            }
        } else if self.playbar_rejoin {
            if let Err(e) = self.playbar.playing(&event.source, &event.track) {
                tracing::warn!(zone = %event.source, error = %e, "Merging pending zones failed");
            }
        }
    }

    fn poll_revert_deadline(&mut self, now: Instant) {
        let Some(deadline) = self.revert_deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        self.revert_deadline = None;

        match self.topology_monitor.is_any_playing() {
            Ok(false) => self.revert(),
            Ok(true) => tracing::info!("Cancelled revert as zones are playing"),
            Err(e) => tracing::warn!(error = %e, "Could not check playback state, revert abandoned"),
        }
    }

    fn revert(&mut self) {
        let Some(default) = self.default_topology.as_ref() else {
            return;
        };

        match self.applier.apply(default) {
            Ok(()) => self.temp_topology = None,
            Err(e) => tracing::warn!(error = %e, "Reverting to default topology failed"),
        }
    }

    fn is_diverged(&self) -> bool {
        match (&self.default_topology, &self.temp_topology) {
            (Some(default), Some(temp)) => default != temp,
            _ => false,
        }
    }

    pub fn state(&self) -> ManagerState {
        if self.revert_deadline.is_some() {
            ManagerState::RevertArmed
        } else if self.is_diverged() {
            ManagerState::Diverged
        } else {
            ManagerState::Stable
        }
    }

    pub fn default_topology(&self) -> Option<&Topology> {
        self.default_topology.as_ref()
    }

    pub fn temp_topology(&self) -> Option<&Topology> {
        self.temp_topology.as_ref()
    }

    pub fn revert_deadline(&self) -> Option<Instant> {
        self.revert_deadline
    }

    pub fn playbar(&self) -> &PlaybarManager {
        &self.playbar
    }
}
