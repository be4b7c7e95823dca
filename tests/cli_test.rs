use std::process::Command;
use tempfile::TempDir;

fn texbook(dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_texbook"));
    command.current_dir(dir).env_remove("RUST_LOG");
    command
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();

    let output = texbook(temp_dir.path())
        .arg("init")
        .output()
        .expect("Failed to run init command");
    assert!(output.status.success());

    let config_path = temp_dir.path().join(".texbook/settings.toml");
    assert!(config_path.exists());

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[pipeline]"));
    assert!(content.contains("[render]"));

    // Second init without --force refuses
    let output = texbook(temp_dir.path()).arg("init").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".texbook");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("settings.toml"),
        r#"
version = 2
[pipeline]
queue_capacity = 77
"#,
    )
    .unwrap();

    let output = texbook(temp_dir.path())
        .arg("config")
        .output()
        .expect("Failed to run config command");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version = 2"));
    assert!(stdout.contains("queue_capacity = 77"));
}

#[test]
fn test_sources_add_and_list() {
    let temp_dir = TempDir::new().unwrap();
    let docs = temp_dir.path().join("thesis");
    std::fs::create_dir_all(&docs).unwrap();
    assert!(texbook(temp_dir.path()).arg("init").status().unwrap().success());

    let output = texbook(temp_dir.path())
        .args(["sources", "add", "thesis", "thesis"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(temp_dir.path().join(".texbook/datasources.json").exists());

    let output = texbook(temp_dir.path())
        .args(["sources", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing[0]["name"], "thesis");
    assert_eq!(listing[0]["metadata"]["type"], "local");

    // Duplicate names are rejected
    let output = texbook(temp_dir.path())
        .args(["sources", "add", "thesis", "thesis"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
}

#[test]
fn test_sources_add_rejects_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    assert!(texbook(temp_dir.path()).arg("init").status().unwrap().success());

    let output = texbook(temp_dir.path())
        .args(["sources", "add", "ghost", "does-not-exist"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_fingerprint_command() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("main.tex");
    std::fs::write(&source, "x").unwrap();

    let output = texbook(temp_dir.path())
        .args(["fingerprint", "main.tex"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let expected = texbook::fingerprint(&source.canonicalize().unwrap()).to_hex();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&expected), "{stdout}");
    assert!(stdout.contains("cached:      false"));
}
