// Integration tests for config and argument handling of `cost-uploader`.
// Run with: cargo test -p cost-uploader-cli --test cli_config

use std::process::{Command, Output};

const CREDENTIAL_VARS: [&str; 7] = [
    "CRITEO_CLIENT_ID",
    "CRITEO_SECRET",
    "KELKOO_CAMPAIGN_ID",
    "KELKOO_TOKEN",
    "FIXER_KEY",
    "GSHEET",
    "GSHEET_KEY",
];

/// Binary with a clean environment: no credentials leak in from the host and
/// the default config location points into `home`.
fn uploader(home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cost-uploader"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("COST_UPLOADER_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {}, got {:?}\nstderr: {}",
        code,
        output.status.code(),
        String::from_utf8_lossy(&output.stderr),
    );
}

#[test]
fn missing_credentials_exits_3() {
    let home = tempfile::tempdir().unwrap();
    let output = uploader(home.path())
        .args(["preview", "--quiet"])
        .output()
        .expect("failed to run cost-uploader");

    assert_exit(&output, 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing required settings"), "stderr: {}", stderr);
    // Every missing value is reported in one go
    for var in ["CRITEO_CLIENT_ID", "CRITEO_SECRET", "KELKOO_CAMPAIGN_ID", "KELKOO_TOKEN", "FIXER_KEY"] {
        assert!(stderr.contains(var), "{} not reported\nstderr: {}", var, stderr);
    }
    assert!(stderr.contains("hint:"), "stderr: {}", stderr);
}

#[test]
fn explicit_config_must_exist() {
    let home = tempfile::tempdir().unwrap();
    let missing = home.path().join("nope.toml");
    let output = uploader(home.path())
        .args(["upload", "--quiet", "--config"])
        .arg(&missing)
        .output()
        .expect("failed to run cost-uploader");

    assert_exit(&output, 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot read config file"), "stderr: {}", stderr);
}

#[test]
fn unknown_config_key_exits_3() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("config.toml");
    std::fs::write(&path, "[criteo]\nclient_idd = \"typo\"\n").unwrap();

    let output = uploader(home.path())
        .args(["preview", "--quiet", "--config"])
        .arg(&path)
        .output()
        .expect("failed to run cost-uploader");

    assert_exit(&output, 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config file"), "stderr: {}", stderr);
}

#[test]
fn upload_without_sheet_settings_exits_3_before_fetching() {
    let home = tempfile::tempdir().unwrap();
    // Upstream credentials present, sheet ones absent. Base URLs point at a
    // closed port: reaching the network would yield 54, not 3.
    let path = home.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[criteo]
client_id = "cid"
client_secret = "secret"
base_url = "http://127.0.0.1:9"

[kelkoo]
campaign_id = "987"
token = "kk"
base_url = "http://127.0.0.1:9"

[fixer]
api_key = "fx"
base_url = "http://127.0.0.1:9"
"#,
    )
    .unwrap();

    let output = uploader(home.path())
        .args(["upload", "--quiet", "--config"])
        .arg(&path)
        .output()
        .expect("failed to run cost-uploader");

    assert_exit(&output, 3);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GSHEET_KEY"), "stderr: {}", stderr);
    assert!(stderr.contains("GSHEET"), "stderr: {}", stderr);
}

#[test]
fn unknown_subcommand_exits_2() {
    let home = tempfile::tempdir().unwrap();
    let output = uploader(home.path())
        .args(["download"])
        .output()
        .expect("failed to run cost-uploader");
    assert_exit(&output, 2);
}

#[test]
fn quiet_and_verbose_conflict() {
    let home = tempfile::tempdir().unwrap();
    let output = uploader(home.path())
        .args(["preview", "--quiet", "--verbose"])
        .output()
        .expect("failed to run cost-uploader");
    assert_exit(&output, 2);
}
