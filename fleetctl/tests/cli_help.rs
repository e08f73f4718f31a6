use assert_cmd::cargo::cargo_bin_cmd;

#[test]
fn top_level_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("fleetctl");
    let output = cmd.arg("--help").assert().success().get_output().stdout.clone();
    let text = String::from_utf8_lossy(&output);
    for sub in ["get", "watch", "delete", "logs", "config", "cache-stats"] {
        assert!(text.contains(sub), "help missing '{sub}' subcommand");
    }
}

#[test]
fn get_help_documents_namespace_flag() {
    let mut cmd = cargo_bin_cmd!("fleetctl");
    let output = cmd
        .arg("get")
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("--namespace"), "get help missing --namespace");
}

#[test]
fn get_pods_in_demo_fleet_prints_rows() {
    let mut cmd = cargo_bin_cmd!("fleetctl");
    let output = cmd
        .arg("get")
        .arg("pod")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("web-1"), "expected demo pod web-1 in output: {text}");
}

#[test]
fn config_subcommand_prints_defaults() {
    let mut cmd = cargo_bin_cmd!("fleetctl");
    let output = cmd
        .arg("config")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("cache_size"));
    assert!(text.contains("1000"));
}

#[test]
fn unknown_kind_is_rejected() {
    let mut cmd = cargo_bin_cmd!("fleetctl");
    cmd.arg("get").arg("widget").assert().failure();
}
