//! Integration tests for the reshare-bot binary

use std::fs;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CREDENTIAL_VARS: [&str; 4] = [
    "CONSUMER_KEY",
    "CONSUMER_SECRET",
    "ACCESS_TOKEN",
    "ACCESS_TOKEN_SECRET",
];

/// Binary with a scrubbed environment and a config file inside `dir`
fn bot(dir: &TempDir, config: &str) -> Command {
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, config).unwrap();

    let mut cmd = Command::cargo_bin("reshare-bot").unwrap();
    for name in CREDENTIAL_VARS {
        cmd.env_remove(name);
    }
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("RESHARE_LOG_FORMAT")
        .env_remove("RESHARE_LOG_LEVEL")
        .env("RESHARE_CONFIG", &config_path);
    cmd
}

fn with_credentials(cmd: &mut Command) -> &mut Command {
    for name in CREDENTIAL_VARS {
        cmd.env(name, format!("test-{}", name.to_lowercase()));
    }
    cmd
}

#[test]
fn test_help_lists_options() {
    let mut cmd = Command::cargo_bin("reshare-bot").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--retry-delay"))
        .stdout(predicate::str::contains("CONSUMER_KEY"));
}

#[test]
fn test_missing_credentials_exit_with_config_error() {
    let dir = TempDir::new().unwrap();

    bot(&dir, "")
        .timeout(Duration::from_secs(10))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("CONSUMER_KEY"));
}

#[test]
fn test_partial_credentials_name_the_missing_one() {
    let dir = TempDir::new().unwrap();
    let mut cmd = bot(&dir, "");
    with_credentials(&mut cmd).env_remove("ACCESS_TOKEN");

    cmd.timeout(Duration::from_secs(10))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("ACCESS_TOKEN"));
}

#[test]
fn test_invalid_watch_list_is_config_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = bot(&dir, "[watch]\nhashtags = [\"rails\"]\n");
    with_credentials(&mut cmd);

    cmd.timeout(Duration::from_secs(10))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_unknown_log_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut cmd = bot(&dir, "");
    with_credentials(&mut cmd);

    cmd.args(["--log-format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log format"));
}

#[test]
fn test_zero_retry_delay_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut cmd = bot(&dir, "");
    with_credentials(&mut cmd);
    cmd.args(["--retry-delay", "0"]).assert().code(2);

    let mut cmd = bot(&dir, "[supervisor]\nretry_delay = 0\n");
    with_credentials(&mut cmd);
    cmd.timeout(Duration::from_secs(10))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("supervisor.retry_delay"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reshares_matching_post_and_retries_after_stream_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1.1/statuses/filter.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "{\"id_str\":\"42\",\"text\":\"Hello #ruby\",",
            "\"entities\":{\"hashtags\":[{\"text\":\"ruby\"}]}}\r\n",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/statuses/retweet/42.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = format!(
        "[twitter]\napi_base = \"{uri}\"\nstream_base = \"{uri}\"\n",
        uri = server.uri()
    );
    let mut cmd = bot(&dir, &config);
    with_credentials(&mut cmd).timeout(Duration::from_secs(3));

    // The daemon never exits on its own; the timeout kills it while it waits
    // to resubscribe after the stream closed.
    let output = tokio::task::spawn_blocking(move || cmd.assert().get_output().clone())
        .await
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stderr.contains("Configuring Rest Client"), "{}", stderr);
    assert!(stderr.contains("Configuring Stream Client"), "{}", stderr);
    assert!(stderr.contains("Caught post -> Hello #ruby"), "{}", stderr);
    assert!(stderr.contains("Re-shared successfully!"), "{}", stderr);
    assert!(
        stderr.contains("Waiting for 60 seconds before resubscribing"),
        "{}",
        stderr
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dry_run_never_calls_retweet() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1.1/statuses/filter.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "{\"id_str\":\"7\",\"text\":\"#rails tips\",",
            "\"entities\":{\"hashtags\":[{\"text\":\"rails\"}]}}\r\n",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/statuses/retweet/7.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = format!("[twitter]\nstream_base = \"{}\"\n", server.uri());
    let mut cmd = bot(&dir, &config);
    with_credentials(&mut cmd)
        .arg("--dry-run")
        .timeout(Duration::from_secs(3));

    let output = tokio::task::spawn_blocking(move || cmd.assert().get_output().clone())
        .await
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stderr.contains("[dry-run] would re-share post 7"), "{}", stderr);
    assert!(!stderr.contains("Configuring Rest Client"), "{}", stderr);
}
