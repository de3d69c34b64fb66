//! Change detectors fed by zone notifications
//!
//! Each monitor owns an [`EventQueue`](crate::event_queue::EventQueue) that
//! the subscription transport fills; draining the monitor turns the buffered
//! notifications into typed events.

mod coordinator;
mod topology;

pub use coordinator::{CoordinatorEvent, CoordinatorMonitor};
pub use topology::{TopologyEvent, TopologyMonitor};
