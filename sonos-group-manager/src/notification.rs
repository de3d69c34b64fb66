use std::collections::BTreeMap;

use sonos_control::EventVariables;

/// Raw payload pushed by the subscription transport
///
/// A flat map of evented state variables keyed by snake_case name
/// (`transport_state`, `current_track_uri`, `zone_group_state`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    variables: BTreeMap<String, String>,
}

impl Notification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mostly for tests and fakes
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn transport_state(&self) -> Option<&str> {
        self.get("transport_state")
    }

    pub fn current_track_uri(&self) -> Option<&str> {
        self.get("current_track_uri")
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }
}

impl From<EventVariables> for Notification {
    fn from(variables: EventVariables) -> Self {
        Self { variables }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_accessors() {
        let notification = Notification::new()
            .with("transport_state", "PLAYING")
            .with("current_track_uri", "x-rincon-queue:RINCON_A#0");

        assert_eq!(notification.transport_state(), Some("PLAYING"));
        assert_eq!(notification.current_track_uri(), Some("x-rincon-queue:RINCON_A#0"));
        assert_eq!(notification.get("volume"), None);
        assert!(Notification::new().variables().is_empty());
    }
}
