use anyhow::Result;
use assert_cmd::Command;
use librepost::store::HistoryLog;
use librepost::{Database, HistoryRecord, PlatformKind, PublishStatus};
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

struct TestEnv {
    _temp_dir: TempDir,
    config_path: PathBuf,
    token: String,
}

fn record(user_id: &str, article_id: &str, platform: PlatformKind, status: PublishStatus, created_at: i64) -> HistoryRecord {
    HistoryRecord {
        id: None,
        user_id: user_id.to_string(),
        article_id: article_id.to_string(),
        account_id: format!("{}-account", platform),
        platform,
        status,
        error_log: (status == PublishStatus::Failed).then(|| "Access denied".to_string()),
        created_at,
    }
}

/// Database with three attempts for one user and one for another
async fn create_test_env() -> Result<TestEnv> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("repost.db").to_string_lossy().replace('\\', "/");
    let db = Database::new(&db_path).await?;

    let user = db.create_user("editor").await?;
    let other = db.create_user("someone-else").await?;

    db.append(&record(&user.id, "a1", PlatformKind::Telegram, PublishStatus::Success, 1_700_000_000)).await?;
    db.append(&record(&user.id, "a1", PlatformKind::Vk, PublishStatus::Failed, 1_700_000_001)).await?;
    db.append(&record(&user.id, "a2", PlatformKind::Telegram, PublishStatus::Success, 1_700_000_100)).await?;
    db.append(&record(&other.id, "a9", PlatformKind::Vk, PublishStatus::Success, 1_700_000_200)).await?;

    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, format!("[database]\npath = \"{}\"\n", db_path))?;

    Ok(TestEnv {
        _temp_dir: temp_dir,
        config_path,
        token: user.token,
    })
}

impl TestEnv {
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("repost-history").unwrap();
        cmd.env("REPOST_CONFIG", &self.config_path);
        cmd.env_remove("REPOST_TOKEN");
        cmd.args(["--token", &self.token]);
        cmd
    }
}

#[tokio::test]
async fn test_history_default_output() -> Result<()> {
    let env = create_test_env().await?;

    env.cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("a1"))
        .stdout(predicate::str::contains("a2"))
        .stdout(predicate::str::contains("vk failed: Access denied"))
        .stdout(predicate::str::contains("a9").not());
    Ok(())
}

#[tokio::test]
async fn test_history_filter_by_article_and_platform() -> Result<()> {
    let env = create_test_env().await?;

    let output = env
        .cmd()
        .args(["--article", "a1", "--platform", "vk", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "failed");
    assert_eq!(records[0]["error_log"], "Access denied");
    Ok(())
}

#[tokio::test]
async fn test_history_jsonl_respects_limit() -> Result<()> {
    let env = create_test_env().await?;

    let output = env.cmd().args(["--format", "jsonl", "--limit", "2"]).output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        serde_json::from_str::<serde_json::Value>(line)?;
    }
    Ok(())
}

#[tokio::test]
async fn test_history_empty_result_is_success() -> Result<()> {
    let env = create_test_env().await?;

    env.cmd()
        .args(["--article", "does-not-exist"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[tokio::test]
async fn test_history_unknown_token_fails() -> Result<()> {
    let env = create_test_env().await?;

    let mut cmd = Command::cargo_bin("repost-history")?;
    cmd.env("REPOST_CONFIG", &env.config_path)
        .args(["--token", "wrong"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown token"));
    Ok(())
}

#[test]
fn test_history_missing_database() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("missing.db");
    std::fs::write(
        &config_path,
        format!("[database]\npath = \"{}\"\n", db_path.to_string_lossy().replace('\\', "/")),
    )
    .unwrap();

    Command::cargo_bin("repost-history")
        .unwrap()
        .env("REPOST_CONFIG", &config_path)
        .args(["--token", "anything"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Database not found"));
}
