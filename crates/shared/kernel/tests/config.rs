use nsgen_kernel::config::load_config;
use nsgen_kernel::domain::config::{ApiConfig, BundleLayout};
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

/// Path of the config file handed to the re-executed test binary.
const CHILD_CONFIG: &str = "NSGEN_TEST_CHILD_CONFIG";

#[test]
#[serial]
fn loads_toml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("server.toml");
    fs::write(
        &path,
        r#"
[server]
port = 8443

[bundle]
layout = "intune-legacy"
download_ttl_seconds = 60
"#,
    )
    .unwrap();

    let cfg: ApiConfig = load_config(Some(&path)).unwrap();
    assert_eq!(cfg.server.port, 8443);
    assert_eq!(cfg.bundle.layout, BundleLayout::IntuneLegacy);
    assert_eq!(cfg.bundle.download_ttl_seconds, 60);
    assert_eq!(cfg.bundle.archive_name, "netskope_config.zip");
}

#[test]
#[serial]
fn explicit_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let result = load_config::<ApiConfig>(Some(dir.path().join("absent.toml")));
    assert!(result.is_err());
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("server.toml");
    fs::write(
        &path,
        r#"
[server]
port = 3001

[bundle]
layout = "plist"
download_ttl_seconds = 300
archive_name = "from_file.zip"
"#,
    )
    .unwrap();

    // The environment of this process cannot be changed without `unsafe`, so the check
    // runs in a fresh copy of the test binary.
    let output = Command::new(std::env::current_exe().unwrap())
        .args(["--exact", "loads_with_environment_layer", "--ignored", "--test-threads=1"])
        .env(CHILD_CONFIG, &path)
        .env("NSGEN__BUNDLE__LAYOUT", "mobileconfig")
        .env("NSGEN__BUNDLE__DOWNLOAD_TTL_SECONDS", "60")
        .env("NSGEN__SERVER__PORT", "8080")
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{stdout}{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("1 passed"), "{stdout}");
}

#[test]
#[ignore = "executed by environment_overrides_file_values with NSGEN__ variables set"]
fn loads_with_environment_layer() {
    let Some(path) = std::env::var_os(CHILD_CONFIG) else {
        return;
    };

    let cfg: ApiConfig = load_config(Some(PathBuf::from(path))).unwrap();
    assert_eq!(cfg.bundle.layout, BundleLayout::Mobileconfig);
    assert_eq!(cfg.bundle.download_ttl_seconds, 60);
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.bundle.archive_name, "from_file.zip");
}
