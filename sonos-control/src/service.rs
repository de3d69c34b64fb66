/// UPnP services the group manager talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// AVTransport - playback state, current track and group membership (x-rincon)
    AVTransport,

    /// ZoneGroupTopology - household grouping; events are broadcast network-wide
    ZoneGroupTopology,
}

/// Endpoint and service URI information for a UPnP service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// HTTP control path, relative to the device base URL
    pub control_endpoint: &'static str,

    /// UPnP service URI used in SOAP requests
    pub service_uri: &'static str,

    /// HTTP event path for GENA subscriptions
    pub event_endpoint: &'static str,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::AVTransport => "AVTransport",
            Service::ZoneGroupTopology => "ZoneGroupTopology",
        }
    }

    pub fn info(&self) -> ServiceInfo {
        match self {
            Service::AVTransport => ServiceInfo {
                control_endpoint: "MediaRenderer/AVTransport/Control",
                service_uri: "urn:schemas-upnp-org:service:AVTransport:1",
                event_endpoint: "MediaRenderer/AVTransport/Event",
            },
            Service::ZoneGroupTopology => ServiceInfo {
                control_endpoint: "ZoneGroupTopology/Control",
                service_uri: "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
                event_endpoint: "ZoneGroupTopology/Event",
            },
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_endpoints() {
        let avt = Service::AVTransport.info();
        assert_eq!(avt.control_endpoint, "MediaRenderer/AVTransport/Control");
        assert_eq!(avt.event_endpoint, "MediaRenderer/AVTransport/Event");

        let zgt = Service::ZoneGroupTopology.info();
        assert_eq!(zgt.service_uri, "urn:schemas-upnp-org:service:ZoneGroupTopology:1");
        assert_eq!(zgt.event_endpoint, "ZoneGroupTopology/Event");
    }
}
