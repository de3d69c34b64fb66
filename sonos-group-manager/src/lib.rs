//! Keeps a Sonos household in its default grouping
//!
//! The default grouping is whatever the household looks like while nothing
//! plays. Regrouping while something plays is treated as temporary and is
//! reverted once every zone has been idle for the configured delay.
//!
//! The reconciliation core ([`GroupManager`] and the monitors it drains)
//! reaches devices only through the [`port`] traits; [`SonosNetwork`]
//! implements them on top of `sonos-control`.

pub mod applier;
pub mod config;
pub mod error;
pub mod event_queue;
pub mod logging;
pub mod manager;
pub mod monitor;
pub mod notification;
pub mod playbar;
pub mod port;
pub mod singleton;
pub mod sonos;
pub mod topology;

pub use applier::TopologyApplier;
pub use config::{CliArgs, GroupManagerConfig, PID_FILE_NAME};
pub use error::{ManagerError, Result};
pub use event_queue::EventQueue;
pub use manager::{GroupManager, ManagerState};
pub use monitor::{CoordinatorEvent, CoordinatorMonitor, TopologyEvent, TopologyMonitor};
pub use notification::Notification;
pub use playbar::{is_passthrough, PlaybarManager};
pub use port::{NotificationSubscriber, SubscriptionHandle, Topic, TransportState, ZoneControl, ZoneStatus};
pub use singleton::PidLock;
pub use sonos::SonosNetwork;
pub use topology::{Topology, ZoneGroup, ZoneId};
