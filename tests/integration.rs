//! End-to-end runs of the `pidx` binary against the local mock server.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn pidx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("pidx");
    path
}

fn setup_test_env(server: &common::MockServer) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[index]
path = "{root}/data/project_index.json"

{http}

[providers.github]
username = "octocat"
api_url = "{gh}"
token_env = "PIDX_TEST_TOKEN_NEVER_SET"

[providers.huggingface]
author = "octocat"
api_url = "{hf}"
token_env = "PIDX_TEST_TOKEN_NEVER_SET"
"#,
        root = root.display(),
        http = common::fast_http(),
        gh = server.github_url(),
        hf = server.hub_api_url(),
    );

    let config_path = config_dir.join("pidx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn seed(server: &common::MockServer) {
    server.hub.set(
        "repos",
        vec![
            common::repo("alpha", "2021-01-01T00:00:00Z"),
            common::repo("beta", "2023-06-01T00:00:00Z"),
        ],
    );
    server
        .hub
        .set("gists", vec![common::gist("g1", "2022-02-02T00:00:00Z")]);
    server.hub.set(
        "models",
        vec![common::hub_item("tiny", "2024-01-01T00:00:00.000Z")],
    );
    server.hub.set(
        "spaces",
        vec![common::hub_item("tiny", "2024-02-01T00:00:00.000Z")],
    );
}

async fn run_pidx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = pidx_binary();
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();

    // The mock server runs on this runtime, so the blocking child process
    // must not occupy the test's own worker.
    let output = tokio::task::spawn_blocking(move || {
        Command::new(&binary)
            .arg("--config")
            .arg(&config_path)
            .args(&args)
            .output()
            .unwrap_or_else(|e| panic!("Failed to run pidx binary at {:?}: {}", binary, e))
    })
    .await
    .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn read_index(root: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(root.join("data/project_index.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_all_writes_unified_and_categorized_files() {
    let server = common::start().await;
    seed(&server);
    let (tmp, config) = setup_test_env(&server);

    let (stdout, stderr, success) = run_pidx(&config, &["sync", "all"]).await;
    assert!(success, "sync failed: stdout={} stderr={}", stdout, stderr);
    assert!(stdout.contains("total projects: 5"));
    assert!(stdout.contains("rate limit remaining: 42/60"));
    assert!(stdout.trim_end().ends_with("ok"));

    let index = read_index(tmp.path());
    assert_eq!(index["total"], 5);
    assert_eq!(index["counts"]["GitHub"]["Repository"], 2);
    assert_eq!(index["counts"]["HuggingFace"]["Space"], 1);
    // newest first
    assert_eq!(index["projects"][0]["full_name"], "spaces/octocat/tiny");

    let organized = tmp.path().join("data/organized");
    for name in [
        "github_repositories.json",
        "github_gists.json",
        "huggingface_models.json",
        "huggingface_datasets.json",
        "huggingface_spaces.json",
    ] {
        assert!(organized.join(name).exists(), "missing {}", name);
    }
    let datasets: Vec<serde_json::Value> = serde_json::from_str(
        &fs::read_to_string(organized.join("huggingface_datasets.json")).unwrap(),
    )
    .unwrap();
    assert!(datasets.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_kind_keeps_existing_records_and_exits_nonzero() {
    let server = common::start().await;
    seed(&server);
    let (tmp, config) = setup_test_env(&server);

    let (_, _, success) = run_pidx(&config, &["sync", "all"]).await;
    assert!(success);

    server.hub.set("gists", Vec::new());
    server.hub.fail("gists", 502);
    let (stdout, _, success) = run_pidx(&config, &["sync", "github"]).await;
    assert!(!success);
    assert!(stdout.contains("degraded"));

    let index = read_index(tmp.path());
    assert_eq!(index["total"], 5);
    assert_eq!(index["counts"]["GitHub"]["Gist"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_corrupt_index_is_not_overwritten() {
    let server = common::start().await;
    seed(&server);
    let (tmp, config) = setup_test_env(&server);

    let index_path = tmp.path().join("data/project_index.json");
    fs::create_dir_all(index_path.parent().unwrap()).unwrap();
    fs::write(&index_path, "{ truncated").unwrap();

    let (_, stderr, success) = run_pidx(&config, &["sync", "all"]).await;
    assert!(!success);
    assert!(stderr.contains("corrupt") || stderr.contains("project index"));
    assert_eq!(fs::read_to_string(&index_path).unwrap(), "{ truncated");
    assert_eq!(server.hub.hits("repos"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dry_run_leaves_no_files() {
    let server = common::start().await;
    seed(&server);
    let (tmp, config) = setup_test_env(&server);

    let (stdout, _, success) = run_pidx(&config, &["sync", "all", "--dry-run"]).await;
    assert!(success);
    assert!(stdout.contains("dry run"));
    assert!(!tmp.path().join("data/project_index.json").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stats_and_list_read_the_index() {
    let server = common::start().await;
    seed(&server);
    let (_tmp, config) = setup_test_env(&server);
    run_pidx(&config, &["sync", "all"]).await;

    let (stdout, _, success) = run_pidx(&config, &["stats"]).await;
    assert!(success);
    assert!(stdout.contains("Projects:    5"));
    assert!(stdout.contains("repositories"));

    let (stdout, _, success) =
        run_pidx(&config, &["list", "--source", "github", "--limit", "1"]).await;
    assert!(success);
    assert!(stdout.contains("octocat/beta"));
    assert!(!stdout.contains("octocat/alpha"));
    assert!(stdout.contains("1 of 5 projects"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_type_filter_refreshes_only_that_type() {
    let server = common::start().await;
    seed(&server);
    let (tmp, config) = setup_test_env(&server);
    run_pidx(&config, &["sync", "all"]).await;

    // Repositories vanish upstream, but only gists are refreshed.
    server.hub.set("repos", Vec::new());
    let (_, _, success) = run_pidx(&config, &["sync", "github", "--type", "gist"]).await;
    assert!(success);

    let index = read_index(tmp.path());
    assert_eq!(index["counts"]["GitHub"]["Repository"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sources_lists_both_providers() {
    let server = common::start().await;
    let (_tmp, config) = setup_test_env(&server);

    let (stdout, _, success) = run_pidx(&config, &["sources"]).await;
    assert!(success);
    assert!(stdout.contains("github"));
    assert!(stdout.contains("huggingface"));
    assert!(stdout.contains("OK"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_config_without_providers_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("pidx.toml");
    fs::write(&config, "[index]\npath = \"./index.json\"\n").unwrap();

    let (_, stderr, success) = run_pidx(&config, &["stats"]).await;
    assert!(!success);
    assert!(stderr.contains("at least one provider"));
}
