//! Typed UPnP actions used by the group manager
//!
//! Each operation knows its service, its SOAP action name, how to render its
//! request into the SOAP body and how to read its `<ActionResponse>` element.

use std::fmt;

use xmltree::Element;

use crate::error::{ControlError, Result};
use crate::service::Service;
use crate::zone_groups::{parse_zone_group_state, ZoneGroup};

/// Common shape of a Sonos UPnP action
pub trait SonosOperation {
    type Request;
    type Response;

    const SERVICE: Service;
    const ACTION: &'static str;

    /// XML placed inside the action element of the SOAP body
    fn build_payload(request: &Self::Request) -> String;

    /// Read the typed response out of the `<ActionResponse>` element
    fn parse_response(xml: &Element) -> Result<Self::Response>;
}

/// AVTransport playback state as reported by `CurrentTransportState`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransportState {
    Playing,
    PausedPlayback,
    Stopped,
    Transitioning,
    NoMediaPresent,
    Other(String),
}

impl TransportState {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "PLAYING" => TransportState::Playing,
            "PAUSED_PLAYBACK" => TransportState::PausedPlayback,
            "STOPPED" => TransportState::Stopped,
            "TRANSITIONING" => TransportState::Transitioning,
            "NO_MEDIA_PRESENT" => TransportState::NoMediaPresent,
            other => TransportState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransportState::Playing => "PLAYING",
            TransportState::PausedPlayback => "PAUSED_PLAYBACK",
            TransportState::Stopped => "STOPPED",
            TransportState::Transitioning => "TRANSITIONING",
            TransportState::NoMediaPresent => "NO_MEDIA_PRESENT",
            TransportState::Other(value) => value,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ZoneGroupTopology `GetZoneGroupState`
pub struct GetZoneGroupStateOperation;

impl SonosOperation for GetZoneGroupStateOperation {
    type Request = ();
    type Response = Vec<ZoneGroup>;

    const SERVICE: Service = Service::ZoneGroupTopology;
    const ACTION: &'static str = "GetZoneGroupState";

    fn build_payload(_request: &Self::Request) -> String {
        String::new()
    }

    fn parse_response(xml: &Element) -> Result<Self::Response> {
        let state = xml
            .get_child("ZoneGroupState")
            .and_then(|e| e.get_text())
            .ok_or_else(|| ControlError::Parse("Missing ZoneGroupState element".to_string()))?;

        parse_zone_group_state(&state)
    }
}

/// AVTransport `GetTransportInfo`
pub struct GetTransportInfoOperation;

pub struct GetTransportInfoRequest {
    pub instance_id: u32,
}

impl SonosOperation for GetTransportInfoOperation {
    type Request = GetTransportInfoRequest;
    type Response = TransportState;

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "GetTransportInfo";

    fn build_payload(request: &Self::Request) -> String {
        format!("<InstanceID>{}</InstanceID>", request.instance_id)
    }

    fn parse_response(xml: &Element) -> Result<Self::Response> {
        xml.get_child("CurrentTransportState")
            .and_then(|e| e.get_text())
            .map(|state| TransportState::parse(&state))
            .ok_or_else(|| ControlError::Parse("Missing CurrentTransportState element".to_string()))
    }
}

/// AVTransport `SetAVTransportURI`
///
/// Pointing a player at `x-rincon:<coordinator uuid>` makes it follow that
/// coordinator, which is how a zone joins a group.
pub struct SetAVTransportURIOperation;

pub struct SetAVTransportURIRequest {
    pub instance_id: u32,
    pub uri: String,
    pub metadata: String,
}

impl SetAVTransportURIRequest {
    /// Request that joins the group coordinated by `coordinator_uuid`
    pub fn join_group(coordinator_uuid: &str) -> Self {
        Self {
            instance_id: 0,
            uri: format!("x-rincon:{}", coordinator_uuid),
            metadata: String::new(),
        }
    }
}

impl SonosOperation for SetAVTransportURIOperation {
    type Request = SetAVTransportURIRequest;
    type Response = ();

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "SetAVTransportURI";

    fn build_payload(request: &Self::Request) -> String {
        format!(
            "<InstanceID>{}</InstanceID><CurrentURI>{}</CurrentURI><CurrentURIMetaData>{}</CurrentURIMetaData>",
            request.instance_id,
            escape_xml(&request.uri),
            escape_xml(&request.metadata)
        )
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response> {
        Ok(())
    }
}

/// AVTransport `BecomeCoordinatorOfStandaloneGroup`: leave the current group
pub struct BecomeCoordinatorOfStandaloneGroupOperation;

impl SonosOperation for BecomeCoordinatorOfStandaloneGroupOperation {
    type Request = ();
    type Response = ();

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "BecomeCoordinatorOfStandaloneGroup";

    fn build_payload(_request: &Self::Request) -> String {
        "<InstanceID>0</InstanceID>".to_string()
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response> {
        Ok(())
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
