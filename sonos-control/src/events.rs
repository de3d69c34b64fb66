//! UPnP event body parsing
//!
//! A NOTIFY body is a `propertyset` whose properties are the evented state
//! variables. AVTransport packs its state into a single escaped `LastChange`
//! document; that document is expanded so that each `val` attribute below
//! `InstanceID` becomes a variable of its own.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{ControlError, Result};
use crate::zone_groups::attr;

/// Evented state variables keyed by snake_case name
pub type EventVariables = BTreeMap<String, String>;

/// Parse a NOTIFY body into its variables
pub fn parse_event_body(xml: &str) -> Result<EventVariables> {
    let mut variables = EventVariables::new();

    for (name, value) in parse_propertyset(xml)? {
        if name == "LastChange" {
            variables.extend(parse_last_change(&value)?);
        } else {
            variables.insert(camel_to_snake(&name), value);
        }
    }

    Ok(variables)
}

/// Raw `(name, text)` pairs of each `<property>` child
fn parse_propertyset(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);

    let mut properties = Vec::new();
    let mut in_property = false;
    let mut current: Option<(String, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "property" {
                    in_property = true;
                } else if in_property && current.is_none() {
                    current = Some((name, String::new()));
                }
            }
            Ok(Event::Empty(e)) if in_property && current.is_none() => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                properties.push((name, String::new()));
            }
            Ok(Event::Text(t)) => {
                if let Some((_, value)) = current.as_mut() {
                    let text = t.unescape().map_err(|e| ControlError::Parse(e.to_string()))?;
                    value.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some((_, value)) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"property" {
                    in_property = false;
                } else if current
                    .as_ref()
                    .is_some_and(|(open, _)| open.as_bytes() == name.as_ref())
                {
                    if let Some(property) = current.take() {
                        properties.push(property);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ControlError::Parse(format!("Invalid event body: {}", e))),
        }
    }

    Ok(properties)
}

/// Expand a `LastChange` document into its instance variables
fn parse_last_change(xml: &str) -> Result<EventVariables> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut variables = EventVariables::new();
    let mut in_instance = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"InstanceID" => in_instance = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"InstanceID" => in_instance = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if in_instance => {
                if let Some(value) = attr(&e, b"val") {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    variables.insert(camel_to_snake(&name), value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ControlError::Parse(format!("Invalid LastChange: {}", e))),
        }
    }

    Ok(variables)
}

/// `CurrentTrackURI` → `current_track_uri`, `AVTransportURI` → `av_transport_uri`
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}
