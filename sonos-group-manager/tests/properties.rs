mod common;

use common::{topology, Harness, MUSIC_TRACK};
use proptest::prelude::*;
use sonos_group_manager::{is_passthrough, Topology, ZoneGroup};

fn zone() -> impl Strategy<Value = String> {
    (1u8..=8).prop_map(|n| format!("10.0.0.{}", n))
}

proptest! {
    #[test]
    fn prop_reordering_members_breaks_equality(
        members in prop::collection::btree_set(zone(), 2..6)
    ) {
        let members: Vec<String> = members.into_iter().collect();
        let mut reversed = members.clone();
        reversed.reverse();

        let coordinator = members[0].clone();
        let listed = Topology::from_groups(&[ZoneGroup::new(coordinator.clone(), members.clone())]);
        let shuffled = Topology::from_groups(&[ZoneGroup::new(coordinator.clone(), reversed)]);
        let rebuilt = Topology::from_groups(&[ZoneGroup::new(coordinator, members)]);

        prop_assert_ne!(&listed, &shuffled);
        prop_assert_eq!(listed, rebuilt);
    }

    #[test]
    fn prop_passthrough_needs_prefix_and_suffix(middle in "[a-zA-Z0-9:_]{0,24}") {
        let passthrough = format!("x-sonos-htastream{}spdif", middle);
        let wrong_prefix = format!("x-rincon{}spdif", middle);
        let wrong_suffix = format!("x-sonos-htastream{}hdmi", middle);

        prop_assert!(is_passthrough(&passthrough), "rejected {}", passthrough);
        prop_assert!(!is_passthrough(&wrong_prefix), "accepted {}", wrong_prefix);
        prop_assert!(!is_passthrough(&wrong_suffix), "accepted {}", wrong_suffix);
    }

    /// Whatever the sequence of snapshots, the last default and the last
    /// temporary one are what the manager keeps
    #[test]
    fn prop_last_snapshot_of_each_kind_wins(
        snapshots in prop::collection::vec((any::<bool>(), 0usize..3), 1..12)
    ) {
        const A: &str = "10.0.0.1";
        const B: &str = "10.0.0.2";
        let groupings: [&[(&str, &[&str])]; 3] = [
            &[(A, &[A, B])],
            &[(A, &[A]), (B, &[B])],
            &[(B, &[B, A])],
        ];

        let mut h = Harness::new(&[A, B]);
        let mut expected_default = None;
        let mut expected_temp = None;

        for (tick, (playing, grouping)) in snapshots.into_iter().enumerate() {
            let groups = groupings[grouping];
            h.control.set_groups(groups);
            let coordinator = groups[0].0;
            h.control.set_playing(A, false);
            h.control.set_playing(B, false);
            h.control.set_playing(coordinator, playing);
            h.topology_changed();
            h.poll(tick as u64);

            if playing {
                expected_temp = Some(topology(groups));
            } else {
                expected_default = Some(topology(groups));
            }
        }

        prop_assert_eq!(h.manager.default_topology(), expected_default.as_ref());
        prop_assert_eq!(h.manager.temp_topology(), expected_temp.as_ref());
    }
}

#[test]
fn test_transport_events_alone_never_record_groupings() {
    let mut h = Harness::new(&["10.0.0.1"]);
    h.transport("10.0.0.1", "PLAYING", MUSIC_TRACK);
    h.transport("10.0.0.1", "STOPPED", MUSIC_TRACK);
    h.poll(0);
    assert!(h.manager.default_topology().is_none());
    assert!(h.manager.temp_topology().is_none());
}
