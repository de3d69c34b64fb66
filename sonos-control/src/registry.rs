use std::collections::HashMap;

use parking_lot::RwLock;

use crate::discovery::Device;
use crate::error::{ControlError, Result};
use crate::zone_groups::ZoneGroup;

/// Two-way map between zone addresses and RINCON identifiers
///
/// Control actions address players by IP, but joining a group names the
/// coordinator by UUID.
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    uuid_by_ip: RwLock<HashMap<String, String>>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_devices(devices: &[Device]) -> Self {
        let registry = Self::new();
        for device in devices {
            registry.record(&device.ip, &device.uuid);
        }
        registry
    }

    pub fn record(&self, ip: &str, uuid: &str) {
        self.uuid_by_ip.write().insert(ip.to_string(), uuid.to_string());
    }

    /// Record every member listed in a fresh ZoneGroupState
    pub fn refresh_from_groups(&self, groups: &[ZoneGroup]) {
        let mut map = self.uuid_by_ip.write();
        for member in groups.iter().flat_map(|g| g.members.iter()) {
            map.insert(member.ip.clone(), member.uuid.clone());
        }
    }

    pub fn uuid_for(&self, ip: &str) -> Result<String> {
        self.uuid_by_ip
            .read()
            .get(ip)
            .cloned()
            .ok_or_else(|| ControlError::UnknownZone(ip.to_string()))
    }
}
