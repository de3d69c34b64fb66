//! Zone player discovery
//!
//! One SSDP search for ZonePlayer devices, deduplicated by description
//! location; each description is fetched over HTTP and non-Sonos devices are
//! dropped.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ControlError, Result};
use crate::ssdp::{self, ZONE_PLAYER_TARGET};
use crate::zone_groups::extract_ip_from_location;

/// A discovered zone player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// RINCON_xxx identifier, without the `uuid:` prefix
    pub uuid: String,
    /// Room name when the description carries one, friendly name otherwise
    pub name: String,
    pub ip: String,
    pub model_name: String,
}

#[derive(Debug, Deserialize)]
struct Root {
    device: DeviceDescription,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceDescription {
    device_type: String,
    friendly_name: String,
    manufacturer: String,
    #[serde(default)]
    model_name: String,
    #[serde(rename = "UDN")]
    udn: String,
    room_name: Option<String>,
}

impl DeviceDescription {
    fn from_xml(xml: &str) -> Result<Self> {
        let root: Root = quick_xml::de::from_str(xml)
            .map_err(|e| ControlError::Parse(format!("Failed to parse device XML: {}", e)))?;
        Ok(root.device)
    }

    fn is_sonos_device(&self) -> bool {
        self.manufacturer.to_lowercase().contains("sonos")
            || self.device_type.contains("ZonePlayer")
    }

    fn into_device(self, ip: String) -> Device {
        let uuid = self
            .udn
            .strip_prefix("uuid:")
            .unwrap_or(&self.udn)
            .to_string();
        Device {
            uuid,
            name: self.room_name.unwrap_or(self.friendly_name),
            ip,
            model_name: self.model_name,
        }
    }
}

/// Discover zone players on the local network
///
/// Devices whose description cannot be fetched or parsed are skipped with a
/// debug log. The result is sorted by IP so startup logs are stable.
pub fn discover(agent: &ureq::Agent, timeout: Duration) -> Result<Vec<Device>> {
    let responses = ssdp::search(ZONE_PLAYER_TARGET, timeout)?;
    tracing::debug!(count = responses.len(), "SSDP answers received");

    let mut seen = HashSet::new();
    let mut devices = Vec::new();

    for response in responses {
        if !seen.insert(response.location.clone()) || !response.is_likely_sonos() {
            continue;
        }

        let Some(ip) = extract_ip_from_location(&response.location) else {
            continue;
        };

        let description = match fetch_description(agent, &response.location) {
            Ok(description) => description,
            Err(e) => {
                tracing::debug!(location = %response.location, error = %e, "skipping device");
                continue;
            }
        };

        if description.is_sonos_device() {
            devices.push(description.into_device(ip));
        }
    }

    devices.sort_by(|a, b| a.ip.cmp(&b.ip));
    Ok(devices)
}

fn fetch_description(agent: &ureq::Agent, location: &str) -> Result<DeviceDescription> {
    let xml = agent
        .get(location)
        .call()
        .map_err(|e| ControlError::Discovery(format!("Failed to fetch device description: {}", e)))?
        .into_string()
        .map_err(|e| ControlError::Discovery(format!("Failed to read response body: {}", e)))?;

    DeviceDescription::from_xml(&xml)
}
