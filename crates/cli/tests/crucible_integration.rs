use std::path::{Path, PathBuf};
use std::process::Output;

use serde_json::json;
use tempfile::TempDir;
use tokio::process::Command;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Isolated home directory with a config pointing at `base_url`.
struct Workspace {
    home: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new(base_url: &str) -> Self {
        let home = TempDir::new().unwrap();
        let config = home.path().join("config.yaml");
        std::fs::write(
            &config,
            format!(
                "default_profile: work\nprofiles:\n  work:\n    base_url: {base_url}\n    username: bob\n"
            ),
        )
        .unwrap();
        Self { home, config }
    }

    fn home(&self) -> &Path {
        self.home.path()
    }

    async fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_crucible-cli"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env("HOME", self.home())
            .env("CRUCIBLE_PASSWORD", "secret")
            .env_remove("CRUCIBLE_CLI_PASSWORD_WORK")
            .env_remove("RUST_LOG")
            .output()
            .await
            .expect("Failed to execute command")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[tokio::test]
async fn test_review_list_with_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest-service/reviews-v1/filter/toReview"))
        .and(header("authorization", "Basic Ym9iOnNlY3JldA=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reviewData": [
                {"permaId": {"id": "CR-1"}, "name": "Parser", "state": "Review",
                 "author": {"userName": "amy"}},
                {"permaId": {"id": "CR-2"}, "name": "Lexer", "state": "Review"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let workspace = Workspace::new(&mock_server.uri());
    let output = workspace
        .run(&["--output", "quiet", "review", "list", "--filter", "toReview"])
        .await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "CR-1\nCR-2\n");
}

#[tokio::test]
async fn test_review_get_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest-service/reviews-v1/CR-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "permaId": {"id": "CR-7"},
            "projectKey": "CR",
            "name": "Docs",
            "state": "Draft"
        })))
        .mount(&mock_server)
        .await;

    let workspace = Workspace::new(&mock_server.uri());
    let output = workspace.run(&["--output", "json", "review", "get", "CR-7"]).await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let review: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(review["permaId"]["id"], "CR-7");
    assert_eq!(review["state"], "Draft");
}

#[tokio::test]
async fn test_review_not_found_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest-service/reviews-v1/CR-404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "NotFound",
            "message": "Review CR-404 does not exist"
        })))
        .mount(&mock_server)
        .await;

    let workspace = Workspace::new(&mock_server.uri());
    let output = workspace.run(&["review", "get", "CR-404"]).await;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Review CR-404 does not exist"));
}

#[tokio::test]
async fn test_transition_sends_action() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest-service/reviews-v1/CR-3/transition"))
        .and(query_param("action", "action:approveReview"))
        .and(query_param("ignoreWarnings", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "permaId": {"id": "CR-3"},
            "state": "Review"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let workspace = Workspace::new(&mock_server.uri());
    let output = workspace.run(&["review", "transition", "CR-3", "approve"]).await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Review CR-3 is now Review"));
}

#[tokio::test]
async fn test_pick_with_choice() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest-service/reviews-v1/filter/toReview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reviewData": [
                {"permaId": {"id": "CR-1231"}},
                {"permaId": {"id": "CR-6122"}}
            ]
        })))
        .mount(&mock_server)
        .await;

    let workspace = Workspace::new(&mock_server.uri());

    let output = workspace.run(&["pick", "--choice", "3"]).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "CR-6122\n");

    let output = workspace.run(&["pick", "--choice", "1"]).await;
    assert_eq!(stdout(&output), "Create new review ...\n");

    let output = workspace.run(&["pick", "--choice", "9"]).await;
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_repo_content_prints_raw_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest-service/repositories-v1/content/core/42/docs/README.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Title\n"))
        .mount(&mock_server)
        .await;

    let workspace = Workspace::new(&mock_server.uri());
    let output = workspace
        .run(&["repo", "content", "core", "42", "docs/README.md"])
        .await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "# Title\n");
}

#[tokio::test]
async fn test_login_stores_password_outside_config() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("nested").join("config.yaml");

    let output = Command::new(env!("CARGO_BIN_EXE_crucible-cli"))
        .arg("--config")
        .arg(&config)
        .args([
            "--profile",
            "work",
            "auth",
            "login",
            "--base-url",
            "https://review.example.com/fecru/",
            "--username",
            "bob",
        ])
        .env("HOME", home.path())
        .env("CRUCIBLE_PASSWORD", "hunter2")
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let yaml = std::fs::read_to_string(&config).unwrap();
    assert!(yaml.contains("base_url: https://review.example.com/fecru"));
    assert!(yaml.contains("username: bob"));
    assert!(!yaml.contains("hunter2"));

    let credentials =
        std::fs::read_to_string(home.path().join(".crucible-cli").join("credentials")).unwrap();
    assert!(credentials.contains("https://review.example.com/fecru|work"));
    assert!(credentials.contains("hunter2"));
}

#[tokio::test]
async fn test_missing_profile_is_reported() {
    let home = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_crucible-cli"))
        .arg("--config")
        .arg(home.path().join("absent.yaml"))
        .args(["review", "list"])
        .env("HOME", home.path())
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap();

    assert!(!output.status.success());
    assert!(stderr(&output).contains("auth login"));
}
