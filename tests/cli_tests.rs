use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir, tables: &str) -> std::path::PathBuf {
    let db_path = dir.path().join("app.db");
    let config = format!(
        "[database]\npath = {:?}\n\n{}",
        db_path.display().to_string(),
        tables
    );
    let config_path = dir.path().join("dbset.toml");
    fs::write(&config_path, config).unwrap();
    config_path
}

const USERS: &str = r#"
[[tables]]
name = "users"
columns = [
    { name = "id", type = "INTEGER PRIMARY KEY" },
    { name = "name", type = "TEXT" },
]
"#;

const USERS_WITH_EMAIL: &str = r#"
[[tables]]
name = "users"
columns = [
    { name = "id", type = "INTEGER PRIMARY KEY" },
    { name = "name", type = "TEXT" },
    { name = "email", type = "TEXT" },
]
"#;

#[test]
fn test_missing_argument_prints_usage() {
    let output = Command::cargo_bin("dbset").unwrap().assert().code(2);
    let stderr = String::from_utf8_lossy(&output.get_output().stderr).to_string();
    assert!(stderr.contains("Usage: dbset"), "{}", stderr);
}

#[test]
fn test_create_then_in_sync_then_alter() {
    let dir = tempfile::tempdir().unwrap();

    let config = write_config(&dir, USERS);
    let first = Command::cargo_bin("dbset")
        .unwrap()
        .arg(&config)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&first.get_output().stdout).to_string();
    assert!(stdout.contains("+ users (created)"), "{}", stdout);

    let second = Command::cargo_bin("dbset")
        .unwrap()
        .arg(&config)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&second.get_output().stdout).to_string();
    assert!(stdout.contains("All tables are in sync."), "{}", stdout);

    let config = write_config(&dir, USERS_WITH_EMAIL);
    let third = Command::cargo_bin("dbset")
        .unwrap()
        .arg(&config)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&third.get_output().stdout).to_string();
    assert!(stdout.contains("~ users"), "{}", stdout);
    assert!(stdout.contains("++ email"), "{}", stdout);
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("broken.toml");
    fs::write(&config_path, "[database\npath = 1").unwrap();

    let output = Command::cargo_bin("dbset")
        .unwrap()
        .arg(&config_path)
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&output.get_output().stderr).to_string();
    assert!(stderr.contains("Synchronization failed"), "{}", stderr);
}
