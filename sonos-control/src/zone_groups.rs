//! ZoneGroupState parsing
//!
//! `GetZoneGroupState` and ZoneGroupTopology events both carry the same
//! (escaped) ZoneGroupState document. Newer firmware wraps it in a
//! `<ZoneGroupState>` root, older firmware starts at `<ZoneGroups>`; the
//! event-based reader below does not care which.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{ControlError, Result};

/// One zone player as listed in a zone group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneGroupMember {
    /// RINCON_xxx identifier
    pub uuid: String,
    /// IP address taken from the member's `Location` URL
    pub ip: String,
    pub zone_name: String,
    /// Bonded players (right channel of a stereo pair, subs) are invisible
    pub invisible: bool,
    /// BOOST/Bridge devices cannot play audio
    pub is_zone_bridge: bool,
}

impl ZoneGroupMember {
    /// Whether the member can be addressed as an independent zone
    pub fn is_visible_zone(&self) -> bool {
        !self.invisible && !self.is_zone_bridge
    }
}

/// A coordinator and the players following it, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneGroup {
    pub id: String,
    pub coordinator_uuid: String,
    pub members: Vec<ZoneGroupMember>,
}

impl ZoneGroup {
    /// The member record of the group coordinator
    pub fn coordinator(&self) -> Option<&ZoneGroupMember> {
        self.members.iter().find(|m| m.uuid == self.coordinator_uuid)
    }

    /// Members that are independent zones
    pub fn visible_members(&self) -> impl Iterator<Item = &ZoneGroupMember> {
        self.members.iter().filter(|m| m.is_visible_zone())
    }
}

/// Parse a ZoneGroupState document into its groups
///
/// Satellites nested under a member are not group members and are skipped.
pub fn parse_zone_group_state(xml: &str) -> Result<Vec<ZoneGroup>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut groups = Vec::new();
    let mut current: Option<ZoneGroup> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"ZoneGroup" => {
                    current = Some(ZoneGroup {
                        id: attr(e, b"ID").unwrap_or_default(),
                        coordinator_uuid: attr(e, b"Coordinator").unwrap_or_default(),
                        members: Vec::new(),
                    });
                }
                b"ZoneGroupMember" => {
                    if let (Some(group), Some(member)) = (current.as_mut(), parse_member(e)) {
                        group.members.push(member);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"ZoneGroup" => {
                if let Some(group) = current.take() {
                    groups.push(group);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ControlError::Parse(format!(
                    "Invalid ZoneGroupState at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    Ok(groups)
}

fn parse_member(e: &BytesStart<'_>) -> Option<ZoneGroupMember> {
    let uuid = attr(e, b"UUID")?;
    let ip = extract_ip_from_location(&attr(e, b"Location")?)?;

    Some(ZoneGroupMember {
        uuid,
        ip,
        zone_name: attr(e, b"ZoneName").unwrap_or_default(),
        invisible: attr(e, b"Invisible").as_deref() == Some("1"),
        is_zone_bridge: attr(e, b"IsZoneBridge").as_deref() == Some("1"),
    })
}

/// Read and unescape an attribute value by (unprefixed) name
pub(crate) fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Extract the host part of a URL like `http://192.168.1.100:1400/xml/device_description.xml`
pub fn extract_ip_from_location(location: &str) -> Option<String> {
    let without_scheme = location.split("//").nth(1)?;
    let host_port = without_scheme.split('/').next()?;
    let host = host_port.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
