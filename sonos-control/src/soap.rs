//! Blocking SOAP and GENA client for Sonos zone players
//!
//! Control actions are SOAP envelopes POSTed to a service's control URL;
//! event subscriptions use the GENA `SUBSCRIBE` verb (initial and renewal) against
//! the service's event URL. Both share one `ureq` agent.

use std::time::Duration;

use xmltree::Element;

use crate::error::SoapError;
use crate::service::Service;

/// Port every Sonos zone player listens on
pub const DEVICE_PORT: u16 = 1400;

/// Response from a GENA subscription request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionResponse {
    /// Subscription ID returned by the device
    pub sid: String,
    /// Timeout granted by the device (in seconds)
    pub timeout_seconds: u32,
}

/// A minimal SOAP client for Sonos device communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    agent: ureq::Agent,
}

impl SoapClient {
    /// Create a new SOAP client with default timeouts
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(5))
                .timeout_read(Duration::from_secs(10))
                .build(),
        }
    }

    /// The underlying HTTP agent, shared with discovery
    pub fn agent(&self) -> &ureq::Agent {
        &self.agent
    }

    /// Invoke `action` on `service` and return the `<ActionResponse>` element
    pub fn call(
        &self,
        ip: &str,
        service: Service,
        action: &str,
        payload: &str,
    ) -> Result<Element, SoapError> {
        let info = service.info();
        let body = envelope(info.service_uri, action, payload);
        let url = format!("http://{}:{}/{}", ip, DEVICE_PORT, info.control_endpoint);
        let soap_action = format!("\"{}#{}\"", info.service_uri, action);

        tracing::trace!(ip, action, "SOAP request");

        let xml_text = match self
            .agent
            .post(&url)
            .set("Content-Type", "text/xml; charset=\"utf-8\"")
            .set("SOAPACTION", &soap_action)
            .send_string(&body)
        {
            Ok(response) => response
                .into_string()
                .map_err(|e| SoapError::Network(e.to_string()))?,
            // UPnP faults arrive as HTTP 500 with a SOAP body
            Err(ureq::Error::Status(status, response)) => {
                let text = response
                    .into_string()
                    .map_err(|e| SoapError::Network(e.to_string()))?;
                return match Element::parse(text.as_bytes()) {
                    Ok(xml) => match extract_response(&xml, action) {
                        Err(fault @ SoapError::Fault(_)) => Err(fault),
                        _ => Err(SoapError::Network(format!("HTTP {}", status))),
                    },
                    Err(_) => Err(SoapError::Network(format!("HTTP {}", status))),
                };
            }
            Err(e) => return Err(SoapError::Network(e.to_string())),
        };

        let xml =
            Element::parse(xml_text.as_bytes()).map_err(|e| SoapError::Parse(e.to_string()))?;

        extract_response(&xml, action)
    }

    /// Subscribe `callback_url` to the events of `service` on the device at `ip`
    pub fn subscribe(
        &self,
        ip: &str,
        service: Service,
        callback_url: &str,
        timeout_seconds: u32,
    ) -> Result<SubscriptionResponse, SoapError> {
        let response = self
            .agent
            .request("SUBSCRIBE", &event_url(ip, service))
            .set("HOST", &format!("{}:{}", ip, DEVICE_PORT))
            .set("CALLBACK", &format!("<{}>", callback_url))
            .set("NT", "upnp:event")
            .set("TIMEOUT", &format!("Second-{}", timeout_seconds))
            .call()
            .map_err(|e| SoapError::Network(e.to_string()))?;

        let sid = response
            .header("SID")
            .ok_or_else(|| SoapError::Parse("Missing SID header in SUBSCRIBE response".to_string()))?
            .to_string();

        let timeout_seconds = response
            .header("TIMEOUT")
            .and_then(parse_timeout_header)
            .unwrap_or(timeout_seconds);

        Ok(SubscriptionResponse { sid, timeout_seconds })
    }

    /// Renew an existing subscription, returning the newly granted timeout
    pub fn renew(
        &self,
        ip: &str,
        service: Service,
        sid: &str,
        timeout_seconds: u32,
    ) -> Result<u32, SoapError> {
        let response = self
            .agent
            .request("SUBSCRIBE", &event_url(ip, service))
            .set("HOST", &format!("{}:{}", ip, DEVICE_PORT))
            .set("SID", sid)
            .set("TIMEOUT", &format!("Second-{}", timeout_seconds))
            .call()
            .map_err(|e| SoapError::Network(e.to_string()))?;

        Ok(response
            .header("TIMEOUT")
            .and_then(parse_timeout_header)
            .unwrap_or(timeout_seconds))
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

fn envelope(service_uri: &str, action: &str, payload: &str) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{service_uri}">{payload}</u:{action}></s:Body></s:Envelope>"#
    )
}

fn event_url(ip: &str, service: Service) -> String {
    format!("http://{}:{}/{}", ip, DEVICE_PORT, service.info().event_endpoint)
}

/// Parse a `Second-1800` style TIMEOUT header
fn parse_timeout_header(value: &str) -> Option<u32> {
    value.strip_prefix("Second-")?.trim().parse().ok()
}

/// Pull the `<{action}Response>` element out of an envelope, mapping faults
fn extract_response(xml: &Element, action: &str) -> Result<Element, SoapError> {
    let body = xml
        .get_child("Body")
        .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

    if let Some(fault) = body.get_child("Fault") {
        let error_code = fault
            .get_child("detail")
            .and_then(|d| d.get_child("UPnPError"))
            .and_then(|e| e.get_child("errorCode"))
            .and_then(|c| c.get_text())
            .and_then(|t| t.trim().parse::<u16>().ok())
            .unwrap_or(500);
        return Err(SoapError::Fault(error_code));
    }

    let response_name = format!("{}Response", action);
    body.get_child(response_name.as_str())
        .cloned()
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wraps_payload_in_action() {
        let body = envelope(
            "urn:schemas-upnp-org:service:AVTransport:1",
            "GetTransportInfo",
            "<InstanceID>0</InstanceID>",
        );
        assert!(body.contains(
            r#"<u:GetTransportInfo xmlns:u="urn:schemas-upnp-org:service:AVTransport:1"><InstanceID>0</InstanceID></u:GetTransportInfo>"#
        ));
    }

    #[test]
    fn test_extract_response_with_valid_response() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <u:GetTransportInfoResponse xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">
                        <CurrentTransportState>PLAYING</CurrentTransportState>
                    </u:GetTransportInfoResponse>
                </s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        let response = extract_response(&xml, "GetTransportInfo").unwrap();
        assert_eq!(response.name, "GetTransportInfoResponse");
    }

    #[test]
    fn test_extract_response_with_upnp_fault() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <s:Fault>
                        <faultcode>s:Client</faultcode>
                        <faultstring>UPnPError</faultstring>
                        <detail>
                            <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
                                <errorCode>701</errorCode>
                            </UPnPError>
                        </detail>
                    </s:Fault>
                </s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "SetAVTransportURI") {
            Err(SoapError::Fault(code)) => assert_eq!(code, 701),
            other => panic!("Expected SoapError::Fault, got {:?}", other),
        }
    }

    #[test]
    fn test_fault_without_detail_defaults_to_500() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body><s:Fault><faultcode>s:Server</faultcode></s:Fault></s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        assert!(matches!(
            extract_response(&xml, "Play"),
            Err(SoapError::Fault(500))
        ));
    }

    #[test]
    fn test_extract_response_missing_body() {
        let xml_str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"></s:Envelope>"#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "Play") {
            Err(SoapError::Parse(msg)) => assert!(msg.contains("Missing SOAP Body")),
            other => panic!("Expected SoapError::Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_timeout_header() {
        assert_eq!(parse_timeout_header("Second-1800"), Some(1800));
        assert_eq!(parse_timeout_header("Second-infinite"), None);
        assert_eq!(parse_timeout_header("1800"), None);
    }
}
