//! SSDP M-SEARCH over UDP multicast

use std::net::UdpSocket;
use std::time::{Duration, Instant};

use crate::error::{ControlError, Result};

const MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Search target answered by every Sonos zone player
pub const ZONE_PLAYER_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// Headers of one M-SEARCH answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SsdpResponse {
    pub location: String,
    pub st: String,
    pub usn: String,
    pub server: Option<String>,
}

impl SsdpResponse {
    /// Cheap pre-filter before fetching the device description
    pub fn is_likely_sonos(&self) -> bool {
        self.st.contains("ZonePlayer")
            || self.usn.contains("RINCON")
            || self
                .server
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains("sonos"))
    }
}

/// Send one M-SEARCH and collect every answer that arrives within `timeout`
pub(crate) fn search(search_target: &str, timeout: Duration) -> Result<Vec<SsdpResponse>> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .map_err(|e| ControlError::Discovery(format!("Failed to bind UDP socket: {}", e)))?;
    socket
        .set_multicast_loop_v4(true)
        .map_err(|e| ControlError::Discovery(format!("Failed to set multicast loop: {}", e)))?;

    let mx = timeout.as_secs().clamp(1, 5);
    let request = format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {MULTICAST_ADDR}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx}\r\n\
         ST: {search_target}\r\n\
         \r\n"
    );
    socket
        .send_to(request.as_bytes(), MULTICAST_ADDR)
        .map_err(|e| ControlError::Discovery(format!("Failed to send M-SEARCH: {}", e)))?;

    let deadline = Instant::now() + timeout;
    let mut buffer = [0u8; 2048];
    let mut responses = Vec::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        socket
            .set_read_timeout(Some(remaining))
            .map_err(|e| ControlError::Discovery(format!("Failed to set read timeout: {}", e)))?;

        match socket.recv_from(&mut buffer) {
            Ok((size, from)) => {
                let Ok(text) = std::str::from_utf8(&buffer[..size]) else {
                    continue;
                };
                match parse_ssdp_response(text) {
                    Some(response) => responses.push(response),
                    None => tracing::trace!(%from, "ignoring malformed SSDP answer"),
                }
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => return Err(ControlError::Discovery(format!("Socket error: {}", e))),
        }
    }

    Ok(responses)
}

fn parse_ssdp_response(response: &str) -> Option<SsdpResponse> {
    let mut location = None;
    let mut st = None;
    let mut usn = None;
    let mut server = None;

    for line in response.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match name.trim().to_ascii_uppercase().as_str() {
            "LOCATION" => location = Some(value),
            "ST" => st = Some(value),
            "USN" => usn = Some(value),
            "SERVER" => server = Some(value),
            _ => {}
        }
    }

    Some(SsdpResponse {
        location: location?,
        st: st?,
        usn: usn?,
        server,
    })
}
