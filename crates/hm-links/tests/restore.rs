//! End-to-end tests of backup and restore against the in-memory controller
//!
//! Every test builds a small network in `MockRpc`, runs the link tools on it
//! and asserts on the recorded remote calls.

use hm_core::{
    LinkFlags, ParamValue, ParameterDescriptor, ParameterType, Paramset, ParamsetDescription,
};
use hm_links::{
    read_backup_file, write_backup_file, BackupDocument, Decision, DeviceNames, EntryOutcome,
    LinkBackupEntry, LinkError, Network,
};
use hm_rpc::mock::MockRpc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::tempdir;

// ============================================================================
// Fixtures
// ============================================================================

fn state(value: i64) -> Paramset {
    Paramset::from([("STATE".to_string(), ParamValue::Integer(value))])
}

fn switch_link_description() -> ParamsetDescription {
    let mut state = ParameterDescriptor::new(ParameterType::Integer).with_range(0i64, 1i64);
    state.default = Some(ParamValue::Integer(0));
    ParamsetDescription::from([("STATE".to_string(), state)])
}

/// A -> B and C -> D, both with `STATE: 0`
fn two_link_network() -> Arc<MockRpc> {
    Arc::new(
        MockRpc::new()
            .with_device("A:1", "KEY")
            .with_device("B:1", "SWITCH")
            .with_device("C:1", "KEY")
            .with_device("D:1", "SWITCH")
            .with_description("SWITCH", "LINK", switch_link_description())
            .with_link("A:1", "B:1", state(0))
            .with_link("C:1", "D:1", state(0)),
    )
}

fn entry(sender: &str, receiver: &str, psetid: &str, delete: bool) -> LinkBackupEntry {
    LinkBackupEntry {
        delete,
        psetid: psetid.to_string(),
        description: String::new(),
        sender: sender.to_string(),
        receiver: receiver.to_string(),
    }
}

fn document(entries: Vec<LinkBackupEntry>, paramsets: &[(&str, Paramset)]) -> BackupDocument {
    BackupDocument {
        links: entries,
        paramsets: paramsets
            .iter()
            .map(|(id, p)| (id.to_string(), p.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn network(rpc: &Arc<MockRpc>) -> Network {
    Network::new(rpc.clone(), DeviceNames::new())
}

// ============================================================================
// Restore
// ============================================================================

#[tokio::test]
async fn test_dry_run_plans_without_mutations() {
    let rpc = two_link_network();
    let doc = document(
        vec![entry("A:1", "B:1", "0", false), entry("C:1", "D:1", "0", false)],
        &[("0", state(1))],
    );

    let report = network(&rpc).restore(&doc, true).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.outcomes.len(), 2);
    for plan in report.plans() {
        assert_eq!(plan.decision("STATE"), Some(&Decision::Accept));
        assert!(plan.dry_run);
        assert!(!plan.applied);
        assert_eq!(plan.merged["STATE"], ParamValue::Integer(1));
    }
    assert_eq!(report.plans().count(), 2);
    assert!(rpc.mutations().is_empty());
    assert_eq!(rpc.link_paramset("A:1", "B:1"), Some(state(0)));
}

#[tokio::test]
async fn test_wet_run_puts_each_link_once() {
    let rpc = two_link_network();
    let doc = document(
        vec![entry("A:1", "B:1", "0", false), entry("C:1", "D:1", "0", false)],
        &[("0", state(1))],
    );

    let report = network(&rpc).restore(&doc, false).await.unwrap();

    assert_eq!(report.failures(), 0);
    assert_eq!(rpc.calls_to("putParamset").len(), 2);
    assert_eq!(rpc.mutations().len(), 2);
    assert_eq!(rpc.link_paramset("A:1", "B:1"), Some(state(1)));
    assert_eq!(rpc.link_paramset("C:1", "D:1"), Some(state(1)));
    assert!(report.plans().all(|p| p.applied));
}

#[tokio::test]
async fn test_delete_of_missing_link_is_silent() {
    let rpc = two_link_network();
    let doc = document(vec![entry("A:1", "D:1", "0", true)], &[("0", state(1))]);

    let report = network(&rpc).restore(&doc, false).await.unwrap();

    assert!(matches!(
        report.outcomes[0],
        EntryOutcome::NothingToDelete { .. }
    ));
    assert_eq!(report.failures(), 0);
    assert!(rpc.mutations().is_empty());
    let methods: Vec<&str> = rpc.calls().iter().map(|c| c.method).collect();
    assert_eq!(methods, vec!["listDevices", "getLinks"]);
}

#[tokio::test]
async fn test_delete_of_existing_link() {
    let rpc = two_link_network();
    let doc = document(vec![entry("A:1", "B:1", "0", true)], &[("0", state(1))]);

    let report = network(&rpc).restore(&doc, true).await.unwrap();
    assert!(matches!(
        report.outcomes[0],
        EntryOutcome::Deleted { dry_run: true, .. }
    ));
    assert_eq!(rpc.link_count(), 2);

    network(&rpc).restore(&doc, false).await.unwrap();
    assert_eq!(rpc.link_count(), 1);
    assert!(rpc.link_paramset("A:1", "B:1").is_none());
}

fn outcome_kind(outcome: &EntryOutcome) -> &'static str {
    match outcome {
        EntryOutcome::Updated(_) => "Updated",
        EntryOutcome::Created { .. } => "Created",
        EntryOutcome::Deleted { .. } => "Deleted",
        EntryOutcome::NothingToDelete { .. } => "NothingToDelete",
        EntryOutcome::Skipped { .. } => "Skipped",
        EntryOutcome::Failed { .. } => "Failed",
    }
}

#[tokio::test]
async fn test_dry_run_matches_wet_run_for_delete_then_recreate() {
    let doc = document(
        vec![entry("A:1", "B:1", "0", true), entry("A:1", "B:1", "0", false)],
        &[("0", state(1))],
    );

    let dry_rpc = two_link_network();
    let dry = network(&dry_rpc).restore(&doc, true).await.unwrap();
    let wet_rpc = two_link_network();
    let wet = network(&wet_rpc).restore(&doc, false).await.unwrap();

    let dry_kinds: Vec<_> = dry.outcomes.iter().map(outcome_kind).collect();
    let wet_kinds: Vec<_> = wet.outcomes.iter().map(outcome_kind).collect();
    assert_eq!(dry_kinds, vec!["Deleted", "Created"]);
    assert_eq!(dry_kinds, wet_kinds);
    assert!(dry_rpc.mutations().is_empty());
    assert_eq!(dry_rpc.link_paramset("A:1", "B:1"), Some(state(0)));
    assert_eq!(wet.failures(), 0);
}

#[tokio::test]
async fn test_structural_mismatch_writes_nothing() {
    let rpc = two_link_network();
    let mut proposed = state(1);
    proposed.insert("EXTRA".to_string(), ParamValue::Bool(true));
    let doc = document(
        vec![entry("A:1", "B:1", "0", false), entry("C:1", "D:1", "1", false)],
        &[("0", proposed), ("1", state(1))],
    );

    let report = network(&rpc).restore(&doc, false).await.unwrap();

    match &report.outcomes[0] {
        EntryOutcome::Failed { error, .. } => {
            assert!(matches!(error, LinkError::Structural(_)))
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(matches!(report.outcomes[1], EntryOutcome::Updated(_)));
    assert_eq!(rpc.calls_to("putParamset").len(), 1);
    assert_eq!(rpc.calls_to("putParamset")[0].args, vec!["D:1", "C:1"]);
    assert_eq!(rpc.link_paramset("A:1", "B:1"), Some(state(0)));
}

#[tokio::test]
async fn test_rejected_key_keeps_live_value() {
    let rpc = two_link_network();
    let doc = document(vec![entry("A:1", "B:1", "0", false)], &[("0", state(7))]);

    let report = network(&rpc).restore(&doc, false).await.unwrap();

    let plan = report.plans().next().unwrap();
    assert!(matches!(plan.decision("STATE"), Some(Decision::Reject(_))));
    assert!(!plan.changed());
    assert!(!plan.applied);
    assert!(rpc.mutations().is_empty());
}

#[tokio::test]
async fn test_unknown_devices_and_paramset_ids_are_skipped() {
    let rpc = two_link_network();
    let doc = document(
        vec![
            entry("X:1", "B:1", "0", false),
            entry("A:1", "B:1", "9", false),
            entry("C:1", "D:1", "0", false),
        ],
        &[("0", state(1))],
    );

    let report = network(&rpc).restore(&doc, false).await.unwrap();

    assert_eq!(report.skipped(), 2);
    assert!(matches!(report.outcomes[2], EntryOutcome::Updated(_)));
    assert_eq!(rpc.calls_to("putParamset").len(), 1);
}

#[tokio::test]
async fn test_missing_link_is_created() {
    let rpc = two_link_network();
    let doc = document(vec![entry("A:1", "D:1", "0", false)], &[("0", state(1))]);

    let report = network(&rpc).restore(&doc, true).await.unwrap();
    assert!(matches!(
        report.outcomes[0],
        EntryOutcome::Created { plan: None, .. }
    ));
    assert!(rpc.mutations().is_empty());

    let report = network(&rpc).restore(&doc, false).await.unwrap();
    match &report.outcomes[0] {
        EntryOutcome::Created { plan: Some(plan), .. } => assert!(plan.applied),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(rpc.link_paramset("A:1", "D:1"), Some(state(1)));
}

#[tokio::test]
async fn test_failed_creation_is_rolled_back() {
    let rpc = two_link_network();
    rpc.fail_on("putParamset", "device unreachable");
    let doc = document(vec![entry("A:1", "D:1", "0", false)], &[("0", state(1))]);

    let report = network(&rpc).restore(&doc, false).await.unwrap();

    match &report.outcomes[0] {
        EntryOutcome::Failed { error, .. } => {
            assert!(error.is_communication());
            assert!(error.to_string().contains("device unreachable"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(rpc.calls_to("addLink").len(), 1);
    assert_eq!(rpc.calls_to("removeLink").len(), 1);
    assert_eq!(rpc.link_count(), 2);
}

// ============================================================================
// Backup
// ============================================================================

#[tokio::test]
async fn test_backup_shares_identical_paramsets() {
    let rpc = Arc::new(
        MockRpc::new()
            .with_device("A:1", "KEY")
            .with_device("B:1", "SWITCH")
            .with_device("C:1", "KEY")
            .with_device("D:1", "SWITCH")
            .with_link("A:1", "B:1", state(0))
            .with_flagged_link("C:1", "D:1", LinkFlags::RECEIVER_BROKEN, state(0))
            .with_link("A:1", "D:1", state(1)),
    );
    let mut names = DeviceNames::new();
    names.insert("A:1", "Button");
    let network = Network::new(rpc.clone(), names);

    let mut links = network.links().await.unwrap();
    let doc = network.build_backup(&mut links).await.unwrap();

    assert_eq!(doc.paramsets.len(), 2);
    assert_eq!(doc.links.len(), 3);
    let ids: Vec<&str> = doc.links.iter().map(|e| e.psetid.as_str()).collect();
    assert_eq!(ids, vec!["0", "0", "1"]);
    assert!(doc.links.iter().all(|e| !e.delete));
    assert!(doc.links[0].description.starts_with("Button"));
    assert!(doc.links[1].description.contains("D:1(*)"));
    assert!(rpc.calls_to("getParamset").is_empty());
}

#[tokio::test]
async fn test_backup_file_restores_unchanged_network_without_writes() {
    let rpc = two_link_network();
    let network = network(&rpc);
    let dir = tempdir().unwrap();
    let path = dir.path().join("links.json");

    let mut links = network.links().await.unwrap();
    let doc = network.build_backup(&mut links).await.unwrap();
    write_backup_file(&path, &doc, false).unwrap();

    let restored = read_backup_file(&path).unwrap();
    assert_eq!(restored, doc);

    let report = network.restore(&restored, false).await.unwrap();
    assert_eq!(report.failures(), 0);
    assert!(report.plans().all(|p| p.decisions.is_empty()));
    assert!(rpc.mutations().is_empty());
    assert!(rpc.calls_to("getParamsetDescription").is_empty());
}

#[tokio::test]
async fn test_hand_written_backup_with_integer_psetid() {
    let rpc = two_link_network();
    let text = json!({
        "Linklist": [
            {"delete": false, "psetid": 0, "desc": "", "sender": "A:1", "receiver": "B:1"}
        ],
        "Paramsets": {"0": {"STATE": 1}}
    })
    .to_string();
    let doc = BackupDocument::from_json_str(&text, "inline").unwrap();

    let report = network(&rpc).restore(&doc, false).await.unwrap();
    assert_eq!(report.failures(), 0);
    assert_eq!(rpc.link_paramset("A:1", "B:1"), Some(state(1)));
}
