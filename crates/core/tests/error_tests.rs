//! Tests for error types

use std::path::Path;
use toolsmith_core::Error;

#[test]
fn test_configuration_error() {
    let error = Error::configuration("root is invalid");
    assert_eq!(error.to_string(), "Configuration error: root is invalid");
}

#[test]
fn test_tool_not_found_error() {
    let error = Error::tool_not_found("gcc");
    assert_eq!(error.to_string(), "Tool 'gcc' is not registered");
}

#[test]
fn test_incompatible_error_names_platform() {
    let error = Error::incompatible("libevmone", toolsmith_core::Platform::DARWIN_ARM64);
    assert_eq!(
        error.to_string(),
        "Tool 'libevmone' is not available for platform darwin-arm64"
    );
}

#[test]
fn test_download_error_has_context() {
    let error = Error::download("go", "https://go.dev/dl/x.tar.gz", "HTTP 404");
    let rendered = error.to_string();
    assert!(rendered.contains("go"));
    assert!(rendered.contains("https://go.dev/dl/x.tar.gz"));
    assert!(rendered.contains("HTTP 404"));
}

#[test]
fn test_io_error_with_and_without_path() {
    use std::io;

    let error = Error::io(
        io::Error::new(io::ErrorKind::NotFound, "missing"),
        Path::new("/tmp/x"),
        "read",
    );
    assert_eq!(error.to_string(), "I/O read failed: /tmp/x");

    let error = Error::io_no_path(io::Error::other("boom"), "spawn");
    assert_eq!(error.to_string(), "I/O spawn failed");
}

#[test]
fn test_command_failed_rendering() {
    let error = Error::CommandFailed {
        command: "go build".to_string(),
        exit_code: Some(2),
        stderr: String::new(),
    };
    assert_eq!(error.to_string(), "Command `go build` failed with exit code 2");

    let error = Error::CommandFailed {
        command: "go build".to_string(),
        exit_code: None,
        stderr: String::new(),
    };
    assert_eq!(
        error.to_string(),
        "Command `go build` failed (terminated by signal)"
    );
}

#[test]
fn test_in_package_wraps_failures() {
    let error = Error::CommandFailed {
        command: "go build".to_string(),
        exit_code: Some(1),
        stderr: String::new(),
    }
    .in_package("cmd/server");
    match &error {
        Error::Compile { package, message } => {
            assert_eq!(package, "cmd/server");
            assert!(message.contains("exit code 1"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_in_package_keeps_cancellation() {
    let error = Error::Cancelled {
        command: "go build".to_string(),
    }
    .in_package("cmd/server");
    assert!(error.is_cancelled());
}

#[test]
fn test_dirty_tree_shows_status() {
    let error = Error::DirtyTree {
        status: " M go.sum".to_string(),
    };
    assert!(error.to_string().ends_with(" M go.sum"));
}

#[test]
fn test_diagnostic_codes() {
    use miette::Diagnostic;

    let error = Error::ChecksumMismatch {
        tool: "go".into(),
        url: "u".into(),
        expected: "a".into(),
        actual: "b".into(),
    };
    assert_eq!(
        error.code().map(|c| c.to_string()),
        Some("toolsmith::install::checksum".to_string())
    );
    assert!(error.help().is_some());
}
