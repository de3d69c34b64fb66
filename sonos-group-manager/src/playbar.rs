//! Soundbar passthrough tracking
//!
//! When a soundbar switches to its TV input it starts playing a passthrough
//! stream. Such a zone is recorded as pending under the coordinator of its
//! default group. When that coordinator later resumes normal playback, the
//! pending zones are told to join it again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::Result;
use crate::port::ZoneControl;
use crate::topology::{Topology, ZoneId};

const PASSTHROUGH_PREFIX: &str = "x-sonos-htastream";
const PASSTHROUGH_SUFFIX: &str = "spdif";

/// Whether `track` is the optical passthrough stream of a soundbar
pub fn is_passthrough(track: &str) -> bool {
    track.starts_with(PASSTHROUGH_PREFIX) && track.ends_with(PASSTHROUGH_SUFFIX)
}

pub struct PlaybarManager {
    control: Arc<dyn ZoneControl>,
    topology: Option<Topology>,
    pending: BTreeMap<ZoneId, BTreeSet<ZoneId>>,
}

impl PlaybarManager {
    pub fn new(control: Arc<dyn ZoneControl>, topology: Option<Topology>) -> Self {
        Self {
            control,
            topology,
            pending: BTreeMap::new(),
        }
    }

    /// `zone` reported playing `track`
    ///
    /// A passthrough track files `zone` under its default coordinator. Any
    /// other track, reported by a zone that has pending members of its own,
    /// makes those members join it. The first failing join abandons the rest.
    pub fn playing(&mut self, zone: &str, track: &str) -> Result<()> {
        if is_passthrough(track) {
            let Some(coordinator) = self
                .topology
                .as_ref()
                .and_then(|t| t.coordinator_of(zone))
                .cloned()
            else {
                return Ok(());
            };

            tracing::info!(zone, coordinator = %coordinator, "Detected playbar in TV mode");
            self.pending
                .entry(coordinator)
                .or_default()
                .insert(zone.to_string());
            return Ok(());
        }

        let Some(members) = self.pending.get(zone).filter(|m| !m.is_empty()) else {
            return Ok(());
        };

        tracing::info!(
            coordinator = zone,
            members = ?members,
            "Merging pending zones into group"
        );
        for member in members {
            self.control.join(member, zone)?;
        }
        Ok(())
    }

    /// `zone` stopped; drop it from the first pending set listing it
    pub fn stopped(&mut self, zone: &str) {
        if let Some((coordinator, members)) = self.pending.iter_mut().find(|(_, m)| m.contains(zone)) {
            members.remove(zone);
            tracing::info!(zone, coordinator = %coordinator, "Removed zone from pending group");
        }
    }

    /// Replace the reference (default) topology
    pub fn set_topology(&mut self, topology: Topology) {
        self.topology = Some(topology);
    }

    /// Zones pending under `coordinator`, if it ever had any
    pub fn pending_for(&self, coordinator: &str) -> Option<&BTreeSet<ZoneId>> {
        self.pending.get(coordinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ZoneStatus;
    use crate::topology::ZoneGroup;

    struct NoDevices;

    impl ZoneControl for NoDevices {
        fn query_groups(&self) -> Result<Vec<ZoneGroup>> {
            Ok(Vec::new())
        }
        fn zone_statuses(&self) -> Result<Vec<ZoneStatus>> {
            Ok(Vec::new())
        }
        fn join(&self, _zone: &str, _coordinator: &str) -> Result<()> {
            panic!("unexpected join")
        }
        fn unjoin(&self, _zone: &str) -> Result<()> {
            panic!("unexpected unjoin")
        }
    }

    #[test]
    fn test_passthrough_pattern() {
        assert!(is_passthrough("x-sonos-htastream:RINCON_5CAAFD0A251401400:spdif"));
        assert!(is_passthrough("x-sonos-htastreamspdif"));
        assert!(!is_passthrough("x-sonos-htastream:RINCON_5CAAFD0A251401400:hdmi"));
        assert!(!is_passthrough("x-rincon:RINCON_5CAAFD0A251401400"));
        assert!(!is_passthrough(""));
    }

    #[test]
    fn test_passthrough_without_reference_topology_is_ignored() {
        let mut playbar = PlaybarManager::new(Arc::new(NoDevices), None);
        playbar.playing("10.0.0.2", "x-sonos-htastream:RINCON_P:spdif").unwrap();
        assert!(playbar.pending_for("10.0.0.1").is_none());
    }

    #[test]
    fn test_passthrough_is_filed_under_default_coordinator() {
        let topology = Topology::from_groups(&[ZoneGroup::new("10.0.0.1", ["10.0.0.1", "10.0.0.2"])]);
        let mut playbar = PlaybarManager::new(Arc::new(NoDevices), Some(topology));

        playbar.playing("10.0.0.2", "x-sonos-htastream:RINCON_P:spdif").unwrap();
        playbar.playing("10.0.0.2", "x-sonos-htastream:RINCON_P:spdif").unwrap();
        assert_eq!(playbar.pending_for("10.0.0.1").map(|s| s.len()), Some(1));

        playbar.stopped("10.0.0.2");
        assert_eq!(playbar.pending_for("10.0.0.1").map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_regular_track_without_pending_members_issues_nothing() {
        let topology = Topology::from_groups(&[ZoneGroup::new("10.0.0.1", ["10.0.0.1"])]);
        let mut playbar = PlaybarManager::new(Arc::new(NoDevices), Some(topology));
        playbar.playing("10.0.0.1", "x-sonos-spotify:track").unwrap();
        playbar.stopped("10.0.0.7");
    }
}
