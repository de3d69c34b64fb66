//! Blocking device layer for Sonos zone players
//!
//! - [`discovery`]: SSDP search and device descriptions
//! - [`client`]: SOAP control (zone group state, transport info, join/unjoin)
//! - [`notify`] and [`subscription`]: GENA event delivery and renewal
//! - [`registry`]: IP ↔ UUID bookkeeping for group commands

pub mod client;
pub mod discovery;
pub mod error;
pub mod events;
pub mod notify;
pub mod operations;
pub mod registry;
pub mod service;
pub mod soap;
mod ssdp;
pub mod subscription;
pub mod zone_groups;

pub use client::SonosClient;
pub use discovery::{discover, Device};
pub use error::{ControlError, Result, SoapError};
pub use events::EventVariables;
pub use notify::{EventHandler, EventRouter, NotifyServer};
pub use operations::TransportState;
pub use registry::ZoneRegistry;
pub use service::Service;
pub use soap::SoapClient;
pub use subscription::SubscriptionManager;
pub use zone_groups::{ZoneGroup, ZoneGroupMember};
