//! Integration tests for tree assembly and the full export run.
//!
//! These tests drive the public API through a scripted [`CommandRunner`], so
//! no real `xe` binary is needed: every query the code under test may issue
//! is spelled out per test, and an unscripted query fails the run the same
//! way a broken `xe` invocation would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use xenmeta_core::assemble::TreeBuilder;
use xenmeta_core::xml;
use xenmeta_core::{
    export_with_resolver, CommandRunner, Error, ExportConfig, ExportPhase, ExportProgress,
    Resolver,
};

/// Scripted stand-in for the `xe` binary: maps a full argument line to its
/// stdout, and fails any query whose argument line contains `fail_on`.
struct FakeXe {
    responses: HashMap<String, String>,
    fail_on: Option<String>,
}

impl FakeXe {
    fn new(script: &[(&str, &str)]) -> Self {
        Self {
            responses: script
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fail_on: None,
        }
    }

    fn failing_on(script: &[(&str, &str)], needle: &str) -> Self {
        let mut fake = Self::new(script);
        fake.fail_on = Some(needle.to_string());
        fake
    }
}

impl CommandRunner for FakeXe {
    fn run(&self, args: &[String]) -> xenmeta_core::Result<String> {
        let key = args.join(" ");
        if let Some(needle) = &self.fail_on {
            if key.contains(needle.as_str()) {
                return Err(Error::query(format!("'xe {key}' exited with status 1")));
            }
        }
        self.responses
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::query(format!("unexpected query: {key}")))
    }
}

/// Script for a VM with no snapshots, one disk and one non-self parent.
fn webserver_script() -> Vec<(&'static str, &'static str)> {
    vec![
        ("vm-list uuid=vm-A params=name-label --minimal", "WebServer\n"),
        ("vm-list uuid=vm-A params=snapshots --minimal", "\n"),
        ("vbd-list vm-uuid=vm-A type=Disk --minimal", "vbd-1\n"),
        ("vbd-list uuid=vbd-1 params=vdi-name-label --minimal", "Disk0\n"),
        ("vm-list uuid=vm-A params=parent --minimal", "parent-1\n"),
        ("vm-list uuid=parent-1 params=selfparent --minimal", "false\n"),
    ]
}

/// Script for a VM with two snapshots, no disks and a self parent.
fn database_script() -> Vec<(&'static str, &'static str)> {
    vec![
        ("vm-list uuid=vm-B params=name-label --minimal", "Database\n"),
        ("vm-list uuid=vm-B params=snapshots --minimal", "snap-1,snap-2\n"),
        ("snapshot-list uuid=snap-1 params=name-label --minimal", "nightly\n"),
        ("snapshot-list uuid=snap-1 params=name-description --minimal", "scheduled backup\n"),
        ("snapshot-list uuid=snap-1 params=is-vmss-snapshot --minimal", "true\n"),
        ("snapshot-list uuid=snap-2 params=name-label --minimal", "pre-upgrade\n"),
        ("snapshot-list uuid=snap-2 params=name-description --minimal", "\n"),
        ("snapshot-list uuid=snap-2 params=is-vmss-snapshot --minimal", "false\n"),
        ("vbd-list vm-uuid=vm-B type=Disk --minimal", "\n"),
        ("vm-list uuid=vm-B params=parent --minimal", "vm-B\n"),
        ("vm-list uuid=vm-B params=selfparent --minimal", "true\n"),
    ]
}

fn pool_script() -> Vec<(&'static str, &'static str)> {
    let mut script = vec![("vm-list --minimal", "vm-A,vm-B\n")];
    script.extend(webserver_script());
    script.extend(database_script());
    script
}

#[test]
fn test_build_preserves_input_order_and_duplicates() {
    let mut script = webserver_script();
    script.extend(database_script());
    let resolver = Resolver::new(FakeXe::new(&script));
    let builder = TreeBuilder::new(&resolver);

    let ids: Vec<String> = ["vm-B", "vm-A", "vm-B"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let inventory = builder.build(&ids).unwrap();

    assert_eq!(inventory.vms.len(), ids.len());
    for (vm, id) in inventory.vms.iter().zip(&ids) {
        assert_eq!(&vm.uuid, id);
    }
    // The repeated uuid is an independent, identical re-resolution.
    assert_eq!(inventory.vms[0], inventory.vms[2]);
}

#[test]
fn test_build_is_idempotent() {
    let script = pool_script();
    let resolver = Resolver::new(FakeXe::new(&script));
    let builder = TreeBuilder::new(&resolver);
    let ids: Vec<String> = vec!["vm-A".to_string(), "vm-B".to_string()];

    let first = builder.build(&ids).unwrap();
    let second = builder.build(&ids).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_boolean_round_trip() {
    let script = database_script();
    let resolver = Resolver::new(FakeXe::new(&script));
    let builder = TreeBuilder::new(&resolver);

    let vm = builder.assemble_vm("vm-B").unwrap();
    assert!(vm.parents[0].selfparent);
    assert!(vm.snapshots[0].is_vmss_snapshot);
    assert!(!vm.snapshots[1].is_vmss_snapshot);

    let xml = xml::render(&xenmeta_core::Inventory { vms: vec![vm] }).unwrap();
    assert!(xml.contains("selfparent=\"true\""));
    assert!(xml.contains("is-vmss-snapshot=\"true\""));
    assert!(xml.contains("is-vmss-snapshot=\"false\""));
}

#[test]
fn test_webserver_scenario_document() {
    let resolver = Resolver::new(FakeXe::new(&webserver_script()));
    let builder = TreeBuilder::new(&resolver);

    let inventory = builder.build(&["vm-A".to_string()]).unwrap();
    let xml = xml::render(&inventory).unwrap();

    let expected = "<vms>\n    \
                    <vm name=\"WebServer\" uuid=\"vm-A\">\n        \
                    <parents>\n            \
                    <parent uuid=\"parent-1\" selfparent=\"false\"/>\n        \
                    </parents>\n        \
                    <vbds>\n            \
                    <vbd uuid=\"vbd-1\" type=\"Disk\" vdi-name-label=\"Disk0\"/>\n        \
                    </vbds>\n        \
                    <snapshots>\n        </snapshots>\n    \
                    </vm>\n</vms>";
    assert_eq!(xml, expected);
}

#[test]
fn test_export_writes_document_and_reports_summary() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("vms.export.xml");
    let config = ExportConfig::new(&output);
    let resolver = Resolver::new(FakeXe::new(&pool_script()));

    let summary = export_with_resolver(&resolver, &config, None).unwrap();

    assert_eq!(summary.vm_count, 2);
    assert_eq!(summary.snapshot_count, 2);
    assert_eq!(summary.vbd_count, 1);
    assert_eq!(summary.parent_count, 2);
    assert_eq!(summary.output, output);

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.len() as u64, summary.bytes_written);
    assert!(written.starts_with("<vms>"));
    assert!(written.contains("name=\"WebServer\""));
    assert!(written.contains("name=\"Database\""));
}

#[test]
fn test_export_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("vms.export.xml");
    std::fs::write(&output, "stale content").unwrap();

    let config = ExportConfig::new(&output);
    let resolver = Resolver::new(FakeXe::new(&pool_script()));
    export_with_resolver(&resolver, &config, None).unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(!written.contains("stale content"));
    assert!(written.starts_with("<vms>"));
}

#[test]
fn test_failed_query_aborts_run_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("vms.export.xml");
    let config = ExportConfig::new(&output);

    // The second VM's snapshot listing fails mid-assembly.
    let resolver = Resolver::new(FakeXe::failing_on(
        &pool_script(),
        "uuid=vm-B params=snapshots",
    ));

    let err = export_with_resolver(&resolver, &config, None).unwrap_err();
    assert!(matches!(err, Error::Query { .. }));
    assert!(!output.exists());
}

#[test]
fn test_unrecognized_filter_falls_back_to_full_listing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("vms.export.xml");
    // Only the unfiltered discovery query is scripted; if the bogus filter
    // leaked into the command line the run would fail on an unexpected query.
    let config = ExportConfig::new(&output).with_filter("name-label=prod");
    let resolver = Resolver::new(FakeXe::new(&pool_script()));

    let summary = export_with_resolver(&resolver, &config, None).unwrap();
    assert_eq!(summary.vm_count, 2);
}

#[test]
fn test_allowed_filter_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("vms.export.xml");
    let config = ExportConfig::new(&output).with_filter("power-state=running");

    let mut script = vec![("vm-list power-state=running --minimal", "vm-A\n")];
    script.extend(webserver_script());
    let resolver = Resolver::new(FakeXe::new(&script));

    let summary = export_with_resolver(&resolver, &config, None).unwrap();
    assert_eq!(summary.vm_count, 1);
}

#[test]
fn test_export_of_empty_pool() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("vms.export.xml");
    let config = ExportConfig::new(&output);
    let resolver = Resolver::new(FakeXe::new(&[("vm-list --minimal", "\n")]));

    let summary = export_with_resolver(&resolver, &config, None).unwrap();

    assert_eq!(summary.vm_count, 0);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "<vms>\n</vms>");
}

#[test]
fn test_progress_callback_reports_phases() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("vms.export.xml");
    let config = ExportConfig::new(&output);
    let resolver = Resolver::new(FakeXe::new(&pool_script()));

    let seen: Arc<Mutex<Vec<ExportProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback = Box::new(move |progress: ExportProgress| {
        sink.lock().unwrap().push(progress);
    });

    export_with_resolver(&resolver, &config, Some(callback)).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.first().map(|p| p.phase), Some(ExportPhase::Discovering));
    assert_eq!(seen.last().map(|p| p.phase), Some(ExportPhase::Complete));

    let assembling: Vec<usize> = seen
        .iter()
        .filter(|p| p.phase == ExportPhase::Assembling)
        .map(|p| p.current_vm)
        .collect();
    assert_eq!(assembling, vec![1, 2]);
    assert!(seen.iter().all(|p| p.phase == ExportPhase::Discovering || p.total_vms == 2));
}
