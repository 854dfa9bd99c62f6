// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

use super::*;

#[test]
fn builder_stamps_action_id_and_defaults() {
    let action = ControlAction::builder(ControlKind::Pause, WorkerId::new("w-1"))
        .reason("deploy freeze")
        .requested_at_ms(1_000)
        .build();

    assert!(action.id.as_str().starts_with("act-"));
    assert_eq!(action.kind, ControlKind::Pause);
    assert_eq!(action.initiator, "operator");
    assert_eq!(action.reason, "deploy freeze");
    assert!(!action.force);
    assert_eq!(action.deadline_ms, None);
}

#[test]
fn selector_describe_lists_workers() {
    let sel = TargetSelector::Workers(vec![WorkerId::new("w-1"), WorkerId::new("w-2")]);
    assert_eq!(sel.describe(), "w-1,w-2");
}

#[test]
fn selector_describe_formats_labels() {
    let mut labels = std::collections::BTreeMap::new();
    labels.insert("env".to_string(), "prod".to_string());
    labels.insert("zone".to_string(), "us".to_string());
    let sel = TargetSelector::Labels(labels);
    assert_eq!(sel.describe(), "env=prod,zone=us");
}

#[test]
fn control_kind_display_matches_wire_names() {
    assert_eq!(ControlKind::RollingRestart.to_string(), "rolling-restart");
    assert_eq!(ControlKind::Drain.to_string(), "drain");
}

#[test]
fn action_round_trips_through_json() {
    let action = ControlAction::builder(ControlKind::Stop, WorkerId::new("w-3"))
        .initiator("alice")
        .deadline_ms(5_000u64)
        .force(true)
        .build();
    let json = serde_json::to_value(&action).unwrap();
    let back: ControlAction = serde_json::from_value(json).unwrap();
    assert_eq!(action, back);
}
