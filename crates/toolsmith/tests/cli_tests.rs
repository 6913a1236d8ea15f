//! End-to-end dispatch through the library entry point.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use toolsmith::app;
use toolsmith::cli::{Cli, CliError, EXIT_CLI, EXIT_EXEC, exit_code_for};

async fn execute(root: &std::path::Path, args: &[&str]) -> Result<String, CliError> {
    let mut argv = vec!["toolsmith", "--root", root.to_str().unwrap()];
    argv.extend_from_slice(args);
    app::execute(Cli::try_parse_from(argv).unwrap(), CancellationToken::new()).await
}

#[tokio::test]
async fn test_commands_listing() {
    let dir = tempfile::tempdir().unwrap();
    let out = execute(dir.path(), &["commands"]).await.unwrap();
    for name in ["lint", "test/go", "tools/install", "git/fetch"] {
        assert!(out.lines().any(|l| l.split_whitespace().next() == Some(name)), "{name}");
    }
}

#[tokio::test]
async fn test_unknown_tool_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = execute(dir.path(), &["tools", "ensure", "nope"]).await.unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_CLI);
}

#[tokio::test]
async fn test_incompatible_tool_fails_before_download() {
    let dir = tempfile::tempdir().unwrap();
    let err = execute(dir.path(), &["tools", "ensure", "libevmone", "--platform", "darwin-arm64"])
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_EXEC);
    assert!(err.to_string().contains("libevmone"));
    assert!(!dir.path().join("tools").exists());
}

#[tokio::test]
async fn test_unknown_named_command_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let err = execute(dir.path(), &["run", "tools/install", "deploy"]).await.unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_CLI);
    assert!(!dir.path().join("tools").exists());
}

#[tokio::test]
async fn test_tools_list_covers_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let out = execute(dir.path(), &["tools", "list"]).await.unwrap();
    let names: Vec<_> = out.lines().filter_map(|l| l.split_whitespace().next()).collect();
    assert!(names.contains(&"go"));
    assert!(names.contains(&"rust"));
    assert!(names.contains(&"protoc-gen-go"));
}
