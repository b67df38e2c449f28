//! Integration tests for the CLI interface

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const PIPELINE_ENV: &[&str] = &[
    "API_KEY",
    "MINIO_ENDPOINT_URL",
    "MINIO_ACCESS_KEY",
    "MINIO_SECRET_KEY",
    "MINIO_DATA_BUCKET",
    "MINIO_REGION",
    "RAW_DATA_PREFIX",
    "STOCKPIPE_SYMBOL",
    "STOCKPIPE_STORAGE_BACKEND",
    "STOCKPIPE_STORAGE_ROOT",
    "STOCKPIPE_PARTITION_TIMEZONE",
    "TIME_ZONE",
    "STOCKPIPE_LOG_LEVEL",
    "RUST_LOG",
];

/// The binary run inside `dir`, isolated from pipeline variables of the outer environment
fn stockpipe(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stockpipe").unwrap();
    cmd.current_dir(dir).env("STOCKPIPE_HOME", dir.join("home"));
    for var in PIPELINE_ENV {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_cli_help_flag() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("materialize"));
}

#[test]
fn test_invalid_command() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn test_list_jobs_shows_assets_in_order() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .args(["list", "jobs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("daily_alpha_vantage_stock_price_job"))
        .stdout(
            predicate::str::is_match(
                "(?s)daily_crawl_alpha_vantage_stock_price.*daily_data_movement_alpha_vantage_stock_price.*daily_data_analysis_alpha_vantage_stock_price",
            )
            .unwrap(),
        );
}

#[test]
fn test_list_assets_shows_dependencies() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .args(["list", "assets"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "deps:  alpha_vantage/stock_price/daily_crawl_alpha_vantage_stock_price",
        ))
        .stdout(predicate::str::contains("kind:  Data Analysis"));
}

#[test]
fn test_list_schedules() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .args(["list", "schedules"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "daily_alpha_vantage_stock_price_job_schedule -> daily_alpha_vantage_stock_price_job [0 0 * * * Asia/Kolkata] enabled",
        ))
        .stdout(predicate::str::contains("next tick:"));
}

#[test]
fn test_list_partitions_starts_at_first_day() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .args(["list", "partitions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\n2024-11-01\n2024-11-02\n"));
}

#[test]
fn test_config_check_reports_every_problem() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .args(["config", "check"])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("crawler.api_key (API_KEY): required"))
        .stdout(predicate::str::contains(
            "bucket.bucket_name (MINIO_DATA_BUCKET): required",
        ))
        .stdout(predicate::str::contains(
            "bucket.endpoint_url (MINIO_ENDPOINT_URL): required for the s3 backend",
        ));
}

#[test]
fn test_config_check_passes_for_memory_backend() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .env("API_KEY", "demo")
        .env("STOCKPIPE_STORAGE_BACKEND", "memory")
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_file_and_dotenv_are_read() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("pipeline.toml"),
        "[storage]\nbackend = \"file\"\nroot = \"data\"\n\n[bucket]\nbucket_name = \"raw-bucket\"\n",
    )
    .unwrap();
    std::fs::write(dir.path().join(".env"), "API_KEY=from-dotenv\n").unwrap();

    stockpipe(dir.path())
        .args(["--config", "pipeline.toml", "config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .args(["--config", "nope.toml", "list", "jobs"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn test_config_show_hides_secrets() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .env("API_KEY", "super-secret-key")
        .env("MINIO_SECRET_KEY", "minio-secret")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("super-secret-key").not())
        .stdout(predicate::str::contains("minio-secret").not())
        .stdout(predicate::str::contains("symbol = \"NVDA\""));
}

#[test]
fn test_status_without_runs() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No materializations recorded"));
}

#[test]
fn test_status_does_not_touch_home() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path()).arg("status").assert().success();
    assert!(!dir.path().join("home").exists());

    std::fs::create_dir(dir.path().join("home")).unwrap();
    std::fs::write(dir.path().join("home").join("runs.json"), "{ not json").unwrap();
    stockpipe(dir.path())
        .arg("status")
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("is corrupted"));

    let entries: Vec<_> = std::fs::read_dir(dir.path().join("home"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec!["runs.json"]);
}

#[test]
fn test_materialize_rejects_partition_before_start() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .env("API_KEY", "demo")
        .env("STOCKPIPE_STORAGE_BACKEND", "memory")
        .args(["materialize", "--partition", "2024-10-31"])
        .assert()
        .failure()
        .code(6)
        .stderr(predicate::str::contains("before the start date"));
}

#[test]
fn test_materialize_rejects_unknown_asset() {
    let dir = TempDir::new().unwrap();
    stockpipe(dir.path())
        .env("API_KEY", "demo")
        .env("STOCKPIPE_STORAGE_BACKEND", "memory")
        .args(["materialize", "--partition", "2024-11-14", "--asset", "no_such_asset"])
        .assert()
        .failure()
        .code(6)
        .stderr(predicate::str::contains("asset 'no_such_asset' is not defined"));
}
