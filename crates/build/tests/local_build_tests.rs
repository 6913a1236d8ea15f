//! Host builds with real toolchains. These download the Go distribution and
//! are ignored by default; run them with `--ignored`.

use toolsmith_build::{BuildRequest, DockerCli, catalog, go, inspect};
use toolsmith_core::{Config, Context, DevPaths, Platform};

const MAIN_GO: &str = "package main\n\nimport \"fmt\"\n\nfunc main() { fmt.Println(\"hi\") }\n";
const GO_MOD: &str = "module example.com/hello\n\ngo 1.22\n";

#[cfg(target_os = "linux")]
#[tokio::test]
#[ignore = "downloads the Go toolchain"]
async fn test_pure_go_build_has_no_interpreter() {
    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("hello");
    std::fs::create_dir_all(&package).unwrap();
    std::fs::write(package.join("go.mod"), GO_MOD).unwrap();
    std::fs::write(package.join("main.go"), MAIN_GO).unwrap();

    let ctx = Context::new(
        DevPaths::new(dir.path().join("dev-root")),
        catalog::registry().unwrap(),
        Config::default(),
    );
    let engine = DockerCli::from_config(&ctx.config().container);
    let req = BuildRequest::new(Platform::local(), &package, dir.path().join("out/hello"));

    let out = go::build(&ctx, &engine, &req).await.unwrap();
    assert_eq!(inspect::interpreter(&out).unwrap(), None);

    // Same inputs, same bytes.
    let first = std::fs::read(&out).unwrap();
    go::build(&ctx, &engine, &req).await.unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), first);
}
