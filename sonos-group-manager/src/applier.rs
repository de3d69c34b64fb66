use std::sync::Arc;

use crate::error::Result;
use crate::port::ZoneControl;
use crate::topology::Topology;

/// Pushes a [`Topology`] onto the devices
pub struct TopologyApplier {
    control: Arc<dyn ZoneControl>,
}

impl TopologyApplier {
    pub fn new(control: Arc<dyn ZoneControl>) -> Self {
        Self { control }
    }

    /// For each coordinator in key order: detach it, then join every other
    /// member to it. Stops at the first failing command.
    pub fn apply(&self, topology: &Topology) -> Result<()> {
        tracing::info!(topology = %topology, "Setting topology");

        for (coordinator, members) in topology.groups() {
            self.control.unjoin(coordinator)?;
            for member in members.iter().filter(|m| *m != coordinator) {
                self.control.join(member, coordinator)?;
            }
        }
        Ok(())
    }
}
