//! Install behaviour of archive tools against local `file://` sources.

use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::Url;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use toolsmith_core::checksum;
use toolsmith_core::config::Config;
use toolsmith_core::link;
use toolsmith_core::{Context, DevPaths, Error, Platform, Source, Tool, ToolRegistry};
use toolsmith_tools_archive::ArchiveTool;

const SAMPLECC: &[u8] = b"#!/bin/sh\necho samplecc 1.0\n";

fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, body) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, *body).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn write_fixture(dir: &Path, name: &str, data: &[u8]) -> String {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    Url::from_file_path(&path).unwrap().to_string()
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    url: String,
    ctx: Context,
    platform: Platform,
}

fn samplecc_context(root: &Path, url: &str, hash: &str) -> Context {
    let tool = ArchiveTool::new("samplecc", "1.0").with_source(
        Platform::local(),
        Source::new(url, hash)
            .unwrap()
            .link("bin/samplecc", "samplecc-1.0/samplecc"),
    );
    let registry = ToolRegistry::from_tools([Arc::new(tool) as Arc<dyn Tool>]).unwrap();
    Context::new(DevPaths::new(root), registry, Config::default())
}

fn fixture(declared_hash: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let fixtures = dir.path().join("fixtures");
    fs::create_dir_all(&fixtures).unwrap();
    let root = dir.path().join("root");

    let archive = tar_gz(&[("samplecc-1.0/samplecc", SAMPLECC)]);
    let hash = declared_hash.map_or_else(
        || format!("sha256:{}", checksum::sha256_hex(&archive)),
        str::to_string,
    );
    let url = write_fixture(&fixtures, "samplecc-1.0.tar.gz", &archive);

    let ctx = samplecc_context(&root, &url, &hash);

    Fixture {
        _dir: dir,
        root,
        url,
        ctx,
        platform: Platform::local(),
    }
}

fn stable_link(f: &Fixture) -> PathBuf {
    f.ctx
        .paths()
        .links_dir("samplecc", "1.0", f.platform)
        .join("bin/samplecc")
}

fn snapshot(root: &Path) -> Vec<(PathBuf, SystemTime)> {
    let mut entries = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            let meta = fs::symlink_metadata(&path).unwrap();
            entries.push((path.clone(), meta.modified().unwrap()));
            if meta.is_dir() {
                stack.push(path);
            }
        }
    }
    entries.sort();
    entries
}

#[tokio::test]
async fn test_ensure_publishes_stable_and_platform_links() {
    let f = fixture(None);
    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();

    let stable = stable_link(&f);
    assert!(link::is_installed(&stable));
    assert_eq!(fs::read(&stable).unwrap(), SAMPLECC);

    let indirection = fs::read_link(&stable).unwrap();
    let expected = format!("samplecc:{}", checksum::sha256_hex(SAMPLECC));
    assert_eq!(indirection, PathBuf::from(expected));

    let platform_bin = f.ctx.bin("bin/samplecc", f.platform);
    assert!(fs::symlink_metadata(&platform_bin).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(&platform_bin).unwrap(), SAMPLECC);
}

#[tokio::test]
async fn test_second_ensure_changes_nothing() {
    let f = fixture(None);
    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();
    let before = snapshot(&f.root);

    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();
    assert_eq!(snapshot(&f.root), before);
}

#[tokio::test]
async fn test_checksum_mismatch_installs_nothing() {
    let wrong = format!("sha256:{}", "0".repeat(64));
    let f = fixture(Some(&wrong));

    let err = f.ctx.ensure_tool("samplecc", f.platform).await.unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }), "{err}");
    assert!(fs::symlink_metadata(stable_link(&f)).is_err());
    assert!(fs::symlink_metadata(f.ctx.bin("bin/samplecc", f.platform)).is_err());
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_published_links_alone() {
    let f = fixture(None);
    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();

    let stable = stable_link(&f);
    let indirection = fs::read_link(&stable).unwrap();
    let suffixed = stable.with_file_name(&indirection);
    let before = [
        fs::symlink_metadata(&stable).unwrap().modified().unwrap(),
        fs::symlink_metadata(&suffixed).unwrap().modified().unwrap(),
    ];
    let artifact = fs::read_link(&suffixed).unwrap();

    // Drift forces a download, which now fails verification.
    fs::write(fs::canonicalize(&stable).unwrap(), b"bit rot").unwrap();
    let wrong = format!("sha256:{}", "0".repeat(64));
    let ctx = samplecc_context(&f.root, &f.url, &wrong);

    let err = ctx.ensure_tool("samplecc", f.platform).await.unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }), "{err}");
    assert_eq!(fs::read_link(&stable).unwrap(), indirection);
    assert_eq!(fs::read_link(&suffixed).unwrap(), artifact);
    let after = [
        fs::symlink_metadata(&stable).unwrap().modified().unwrap(),
        fs::symlink_metadata(&suffixed).unwrap().modified().unwrap(),
    ];
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_incompatible_platform_rejected_before_download() {
    let f = fixture(None);
    let other = Platform::ALL
        .into_iter()
        .find(|p| *p != f.platform)
        .unwrap();

    let err = f.ctx.ensure_tool("samplecc", other).await.unwrap_err();
    assert!(matches!(err, Error::Incompatible { .. }), "{err}");
    assert!(!f.root.exists());
}

#[tokio::test]
async fn test_deleted_artifact_is_reinstalled() {
    let f = fixture(None);
    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();

    let stable = stable_link(&f);
    fs::remove_file(fs::canonicalize(&stable).unwrap()).unwrap();
    assert!(!link::is_installed(&stable));

    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();
    assert!(link::is_installed(&stable));
    assert_eq!(fs::read(&stable).unwrap(), SAMPLECC);
}

#[tokio::test]
async fn test_corrupted_artifact_is_reinstalled_and_reported() {
    let f = fixture(None);
    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();

    let stable = stable_link(&f);
    fs::write(fs::canonicalize(&stable).unwrap(), b"bit rot").unwrap();

    let problems = f.ctx.verify_all().await.unwrap();
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].0, "samplecc");

    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();
    assert_eq!(fs::read(&stable).unwrap(), SAMPLECC);
    assert!(f.ctx.verify_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_declared_path_is_extract_error() {
    let dir = tempfile::tempdir().unwrap();
    let archive = tar_gz(&[("other/file", b"x")]);
    let url = write_fixture(dir.path(), "broken.tar.gz", &archive);
    let hash = format!("sha256:{}", checksum::sha256_hex(&archive));

    let platform = Platform::local();
    let tool = ArchiveTool::new("broken", "0.1").with_source(
        platform,
        Source::new(url, &hash).unwrap().link("bin/broken", "broken/broken"),
    );
    let ctx = Context::new(
        DevPaths::new(dir.path().join("root")),
        ToolRegistry::new(),
        Config::default(),
    );

    let err = tool.ensure(&ctx, platform).await.unwrap_err();
    assert!(matches!(err, Error::Extract { .. }), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ensures_converge() {
    let f = fixture(None);
    let mut handles = Vec::new();
    for _ in 0..6 {
        let ctx = f.ctx.clone();
        let platform = f.platform;
        handles.push(tokio::spawn(async move {
            ctx.ensure_tool("samplecc", platform).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert!(link::is_installed(&stable_link(&f)));
    assert_eq!(fs::read(f.ctx.bin("bin/samplecc", f.platform)).unwrap(), SAMPLECC);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_drift_repair_converges() {
    let f = fixture(None);
    f.ctx.ensure_tool("samplecc", f.platform).await.unwrap();
    let stable = stable_link(&f);

    for round in 0..60 {
        fs::write(fs::canonicalize(&stable).unwrap(), b"bit rot").unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ctx = f.ctx.clone();
            let platform = f.platform;
            handles.push(tokio::spawn(async move {
                ctx.ensure_tool("samplecc", platform).await
            }));
        }
        for handle in handles {
            if let Err(e) = handle.await.unwrap() {
                panic!("round {round}: {e}");
            }
        }

        assert!(link::is_installed(&stable), "round {round}");
        assert_eq!(fs::read(&stable).unwrap(), SAMPLECC);
        assert_eq!(fs::read(f.ctx.bin("bin/samplecc", f.platform)).unwrap(), SAMPLECC);
    }
}

#[tokio::test]
async fn test_raw_source_published_executable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let body = b"#!/bin/sh\nexit 0\n";
    let url = write_fixture(dir.path(), "rustup-init", body);
    let hash = format!("sha256:{}", checksum::sha256_hex(body));

    let platform = Platform::local();
    let tool = ArchiveTool::new("rustup-init", "1.27.1").with_source(
        platform,
        Source::new(url, &hash)
            .unwrap()
            .link("bin/rustup-init", "rustup-init"),
    );
    let ctx = Context::new(
        DevPaths::new(dir.path().join("root")),
        ToolRegistry::new(),
        Config::default(),
    );

    tool.ensure(&ctx, platform).await.unwrap();
    let bin = ctx.bin("bin/rustup-init", platform);
    let mode = fs::metadata(&bin).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);
}
