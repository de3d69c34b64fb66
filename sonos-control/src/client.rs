use crate::error::Result;
use crate::operations::{
    BecomeCoordinatorOfStandaloneGroupOperation, GetTransportInfoOperation,
    GetTransportInfoRequest, GetZoneGroupStateOperation, SetAVTransportURIOperation,
    SetAVTransportURIRequest, SonosOperation, TransportState,
};
use crate::soap::SoapClient;
use crate::zone_groups::ZoneGroup;

/// Executes typed operations against zone players
///
/// All calls block on the underlying `ureq` agent and are never retried.
#[derive(Debug, Clone, Default)]
pub struct SonosClient {
    soap_client: SoapClient,
}

impl SonosClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn soap_client(&self) -> &SoapClient {
        &self.soap_client
    }

    /// Execute an operation against the device at `ip`
    pub fn execute<Op: SonosOperation>(&self, ip: &str, request: &Op::Request) -> Result<Op::Response> {
        let payload = Op::build_payload(request);
        let response = self
            .soap_client
            .call(ip, Op::SERVICE, Op::ACTION, &payload)?;
        Op::parse_response(&response)
    }

    /// Household grouping as seen by the device at `ip`
    pub fn get_zone_groups(&self, ip: &str) -> Result<Vec<ZoneGroup>> {
        self.execute::<GetZoneGroupStateOperation>(ip, &())
    }

    pub fn get_transport_info(&self, ip: &str) -> Result<TransportState> {
        self.execute::<GetTransportInfoOperation>(ip, &GetTransportInfoRequest { instance_id: 0 })
    }

    /// Make the player at `ip` follow the coordinator with `coordinator_uuid`
    pub fn join(&self, ip: &str, coordinator_uuid: &str) -> Result<()> {
        tracing::debug!(ip, coordinator_uuid, "joining group");
        self.execute::<SetAVTransportURIOperation>(
            ip,
            &SetAVTransportURIRequest::join_group(coordinator_uuid),
        )
    }

    /// Take the player at `ip` out of its group
    pub fn unjoin(&self, ip: &str) -> Result<()> {
        tracing::debug!(ip, "leaving group");
        self.execute::<BecomeCoordinatorOfStandaloneGroupOperation>(ip, &())
    }
}
