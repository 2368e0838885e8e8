use assert_cmd::cargo::cargo_bin_cmd;

#[test]
fn help_lists_global_flags_and_subcommands() {
    let mut cmd = cargo_bin_cmd!("sqs-janitor");
    cmd.arg("--help");
    let out = cmd.assert().success();
    let stdout = String::from_utf8(out.get_output().stdout.clone()).expect("utf8");

    assert!(stdout.contains("--max-workers"));
    assert!(stdout.contains("--aws-region"));
    assert!(stdout.contains("--endpoint-url"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("purge"));
}

#[test]
fn invalid_config_path_exits_nonzero() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("sqs-janitor");
    cmd.arg("list")
        .arg("--config")
        .arg(temp.path().join("missing.toml"));
    cmd.assert().failure();
}

#[test]
fn malformed_config_exits_nonzero() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "[fetch\nmax_workers = ").expect("write config");
    let mut cmd = cargo_bin_cmd!("sqs-janitor");
    cmd.arg("list").arg("--config").arg(&path);
    let out = cmd.assert().failure();
    let stderr = String::from_utf8(out.get_output().stderr.clone()).expect("utf8");
    assert!(stderr.contains("config parse error"));
}

#[test]
fn interactive_mode_refuses_piped_stdin() {
    let mut cmd = cargo_bin_cmd!("sqs-janitor");
    cmd.arg("interactive").write_stdin("");
    let out = cmd.assert().failure();
    let stderr = String::from_utf8(out.get_output().stderr.clone()).expect("utf8");
    assert!(stderr.contains("requires a terminal"));
}
