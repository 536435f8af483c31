//! Daemon startup specs
//!
//! Verify config discovery, startup failures and a clean dummy-mode run.

use crate::prelude::*;
use std::io::{BufRead, BufReader};
use std::process::Stdio;

#[test]
fn missing_config_file_fails() {
    let daemon = DummyDaemon::new();

    daemon
        .spkd()
        .arg("nowhere.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere.toml"));
}

#[test]
fn config_path_can_come_from_environment() {
    let daemon = DummyDaemon::new();

    daemon
        .spkd()
        .env("SPK_CONFIG", daemon.path().join("elsewhere.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("elsewhere.toml"));
}

#[test]
fn hardware_mode_without_broker_fails() {
    let daemon = DummyDaemon::new();
    std::fs::write(
        daemon.config_path(),
        "[[zones]]\nid = 1\nname = \"Front\"\nchannel = 31\n",
    )
    .unwrap();

    daemon
        .spkd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("MissingMqtt"));
}

#[test]
fn dummy_daemon_starts_and_stops_on_sigterm() {
    let daemon = DummyDaemon::new();
    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("spkd"))
        .current_dir(daemon.path())
        .env_remove("SPK_CONFIG")
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    let stdout = child.stdout.take().unwrap();
    let mut first = String::new();
    BufReader::new(stdout).read_line(&mut first).unwrap();
    similar_asserts::assert_eq!(first.trim(), "READY");

    let status = std::process::Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(child.wait().unwrap().success());

    let log = std::fs::read_to_string(daemon.log_path()).unwrap();
    assert!(log.contains("--- spkd: starting (pid: "), "log:\n{log}");
    assert!(log.contains("Daemon started"), "log:\n{log}");
    assert!(log.contains("Daemon stopped"), "log:\n{log}");
    assert!(daemon.path().join("state/wal/triggers.wal").exists());
    assert!(!daemon.path().join("state/spkd.pid").exists());
}
