mod common;

use common::{join, topology, unjoin, FakeControl};
use sonos_group_manager::{Topology, TopologyApplier};

#[test]
fn test_coordinators_are_restored_in_key_order() {
    let control = FakeControl::new();
    let applier = TopologyApplier::new(control.clone());

    let target = topology(&[
        ("10.0.0.5", &["10.0.0.5"]),
        ("10.0.0.1", &["10.0.0.3", "10.0.0.1", "10.0.0.2"]),
    ]);
    applier.apply(&target).unwrap();

    assert_eq!(
        control.calls(),
        vec![
            unjoin("10.0.0.1"),
            join("10.0.0.3", "10.0.0.1"),
            join("10.0.0.2", "10.0.0.1"),
            unjoin("10.0.0.5"),
        ]
    );
}

#[test]
fn test_empty_topology_issues_nothing() {
    let control = FakeControl::new();
    TopologyApplier::new(control.clone())
        .apply(&Topology::default())
        .unwrap();
    assert!(control.calls().is_empty());
}

#[test]
fn test_first_failure_stops_the_walk() {
    let control = FakeControl::new();
    control.fail_joins(true);

    let target = topology(&[
        ("10.0.0.1", &["10.0.0.1", "10.0.0.2", "10.0.0.3"]),
        ("10.0.0.4", &["10.0.0.4", "10.0.0.5"]),
    ]);
    assert!(TopologyApplier::new(control.clone()).apply(&target).is_err());

    assert_eq!(
        control.calls(),
        vec![unjoin("10.0.0.1"), join("10.0.0.2", "10.0.0.1")]
    );
}
