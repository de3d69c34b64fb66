//! Household grouping as a pure value

use std::collections::BTreeMap;
use std::fmt;

/// Network identifier of a zone (its IP address)
pub type ZoneId = String;

/// One group as reported by the device port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneGroup {
    pub coordinator: ZoneId,
    /// Members in reported order, the coordinator included
    pub members: Vec<ZoneId>,
}

impl ZoneGroup {
    pub fn new(coordinator: impl Into<ZoneId>, members: impl IntoIterator<Item = impl Into<ZoneId>>) -> Self {
        Self {
            coordinator: coordinator.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

/// Coordinator → ordered members, for every group of the household
///
/// Equality is structural and sensitive to member order: the same groups
/// listed in a different member order compare unequal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    groups: BTreeMap<ZoneId, Vec<ZoneId>>,
}

impl Topology {
    /// Build from a grouping snapshot; a repeated coordinator keeps its last group
    pub fn from_groups(groups: &[ZoneGroup]) -> Self {
        groups
            .iter()
            .map(|g| (g.coordinator.clone(), g.members.clone()))
            .collect()
    }

    /// Groups in coordinator order
    pub fn groups(&self) -> impl Iterator<Item = (&ZoneId, &[ZoneId])> {
        self.groups.iter().map(|(c, m)| (c, m.as_slice()))
    }

    /// Coordinator of the first group (in coordinator order) listing `zone`
    pub fn coordinator_of(&self, zone: &str) -> Option<&ZoneId> {
        self.groups
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == zone))
            .map(|(coordinator, _)| coordinator)
    }
}

impl FromIterator<(ZoneId, Vec<ZoneId>)> for Topology {
    fn from_iter<I: IntoIterator<Item = (ZoneId, Vec<ZoneId>)>>(iter: I) -> Self {
        Self {
            groups: iter.into_iter().collect(),
        }
    }
}

/// `{C: [C, M1]}, {C2: [C2]}`
impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (coordinator, members)) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{{{}: [{}]}}", coordinator, members.join(", "))?;
        }
        Ok(())
    }
}
