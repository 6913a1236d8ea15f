//! Tool catalogue.
//!
//! Every tool toolsmith knows how to provision, pinned to a version and a
//! per-platform source. [`registry`] assembles them into a fresh
//! [`ToolRegistry`]; nothing registers itself.

use std::sync::Arc;
use toolsmith_core::{Platform, Result, Source, Tool, ToolRegistry};
use toolsmith_tools_archive::ArchiveTool;
use toolsmith_tools_package::PackageTool;
use toolsmith_tools_rustup::RustToolchain;

/// Go distribution.
pub const GO: &str = "go";
/// golangci-lint.
pub const GOLANGCI: &str = "golangci";
/// Protocol buffers compiler.
pub const PROTOC: &str = "protoc";
/// protoc plugin generating Go messages.
pub const PROTOC_GEN_GO: &str = "protoc-gen-go";
/// protoc plugin generating Go gRPC services.
pub const PROTOC_GEN_GO_GRPC: &str = "protoc-gen-go-grpc";
/// Rust bootstrap installer.
pub const RUSTUP_INIT: &str = toolsmith_tools_rustup::RUSTUP_INIT;
/// Rust toolchain.
pub const RUST: &str = toolsmith_tools_rustup::RUST;
/// Zig compiler.
pub const ZIG: &str = "zig";
/// Terraform.
pub const TERRAFORM: &str = "terraform";
/// Foundry (anvil, forge, cast).
pub const FOUNDRY: &str = "foundry";
/// evmone shared library for container builds.
pub const LIBEVMONE: &str = "libevmone";

type Links<'a> = &'a [(&'a str, &'a str)];

fn archive(
    name: &str,
    version: &str,
    sources: &[(Platform, &str, &str, Links<'_>)],
) -> Result<Arc<dyn Tool>> {
    let mut tool = ArchiveTool::new(name, version);
    for &(platform, url, hash, links) in sources {
        let source = links
            .iter()
            .fold(Source::new(url, hash)?, |source, (published, path)| {
                source.link(*published, *path)
            });
        tool = tool.with_source(platform, source);
    }
    Ok(Arc::new(tool))
}

/// Every catalogued tool.
///
/// # Errors
///
/// Returns a configuration error if a declared hash is malformed.
pub fn tools() -> Result<Vec<Arc<dyn Tool>>> {
    let go_links: Links<'_> = &[("bin/go", "go/bin/go"), ("bin/gofmt", "go/bin/gofmt")];
    let foundry_links: Links<'_> = &[
        ("bin/anvil", "anvil"),
        ("bin/forge", "forge"),
        ("bin/cast", "cast"),
    ];

    Ok(vec![
        // https://go.dev/dl/
        archive(
            GO,
            "1.23.0",
            &[
                (
                    Platform::LINUX_AMD64,
                    "https://go.dev/dl/go1.23.0.linux-amd64.tar.gz",
                    "sha256:905a297f19ead44780548933e0ff1a1b86e8327bb459e92f9c0012569f76f5e3",
                    go_links,
                ),
                (
                    Platform::DARWIN_AMD64,
                    "https://go.dev/dl/go1.23.0.darwin-amd64.tar.gz",
                    "sha256:ffd070acf59f054e8691b838f274d540572db0bd09654af851e4e76ab88403dc",
                    go_links,
                ),
                (
                    Platform::DARWIN_ARM64,
                    "https://go.dev/dl/go1.23.0.darwin-arm64.tar.gz",
                    "sha256:b770812aef17d7b2ea406588e2b97689e9557aac7e646fe76218b216e2c51406",
                    go_links,
                ),
            ],
        )?,
        // https://github.com/golangci/golangci-lint/releases
        archive(
            GOLANGCI,
            "1.60.2",
            &[
                (
                    Platform::LINUX_AMD64,
                    "https://github.com/golangci/golangci-lint/releases/download/v1.60.2/golangci-lint-1.60.2-linux-amd64.tar.gz",
                    "sha256:607be92de8519aa88de0688e62b02ef87899386e9dfed320a04422bbe352d124",
                    &[("bin/golangci-lint", "golangci-lint-1.60.2-linux-amd64/golangci-lint")],
                ),
                (
                    Platform::DARWIN_AMD64,
                    "https://github.com/golangci/golangci-lint/releases/download/v1.60.2/golangci-lint-1.60.2-darwin-amd64.tar.gz",
                    "sha256:875c91b7e3f00d48142920a15ba336b98a65bce65f93dd8d2f037aed81fed953",
                    &[("bin/golangci-lint", "golangci-lint-1.60.2-darwin-amd64/golangci-lint")],
                ),
                (
                    Platform::DARWIN_ARM64,
                    "https://github.com/golangci/golangci-lint/releases/download/v1.60.2/golangci-lint-1.60.2-darwin-arm64.tar.gz",
                    "sha256:f29c40e162c704b6ca51f328f1c378f4740e50d9a27b17a975873df52cbceb72",
                    &[("bin/golangci-lint", "golangci-lint-1.60.2-darwin-arm64/golangci-lint")],
                ),
            ],
        )?,
        // https://github.com/ethereum/evmone/releases
        archive(
            LIBEVMONE,
            "0.12.0",
            &[(
                Platform::DOCKER_AMD64,
                "https://github.com/ethereum/evmone/releases/download/v0.12.0/evmone-0.12.0-linux-x86_64.tar.gz",
                "sha256:1c7b5eba0c8c3b3b2a7a05101e2d01a13a2f84b323989a29be66285dba4136ce",
                &[("lib/libevmone.so", "lib/libevmone.so")],
            )],
        )?,
        // https://ziglang.org/download/
        archive(
            ZIG,
            "0.13.0",
            &[
                (
                    Platform::LINUX_AMD64,
                    "https://ziglang.org/download/0.13.0/zig-linux-x86_64-0.13.0.tar.xz",
                    "sha256:d45312e61ebcc48032b77bc4cf7fd6915c11fa16e4aad116b66c9468211230ea",
                    &[("bin/zig", "zig-linux-x86_64-0.13.0/zig")],
                ),
                (
                    Platform::DARWIN_AMD64,
                    "https://ziglang.org/download/0.13.0/zig-macos-x86_64-0.13.0.tar.xz",
                    "sha256:8b06ed1091b2269b700b3b07f8e3be3b833000841bae5aa6a09b1a8b4773effd",
                    &[("bin/zig", "zig-macos-x86_64-0.13.0/zig")],
                ),
                (
                    Platform::DARWIN_ARM64,
                    "https://ziglang.org/download/0.13.0/zig-macos-aarch64-0.13.0.tar.xz",
                    "sha256:46fae219656545dfaf4dce12fb4e8685cec5b51d721beee9389ab4194d43394c",
                    &[("bin/zig", "zig-macos-aarch64-0.13.0/zig")],
                ),
            ],
        )?,
        // https://developer.hashicorp.com/terraform/install
        archive(
            TERRAFORM,
            "1.9.5",
            &[
                (
                    Platform::LINUX_AMD64,
                    "https://releases.hashicorp.com/terraform/1.9.5/terraform_1.9.5_linux_amd64.zip",
                    "sha256:9cf727b4d6bd2d4d2908f08bd282f9e4809d6c3071c3b8ebe53558bee6dc913b",
                    &[("bin/terraform", "terraform")],
                ),
                (
                    Platform::DARWIN_AMD64,
                    "https://releases.hashicorp.com/terraform/1.9.5/terraform_1.9.5_darwin_amd64.zip",
                    "sha256:c28945c377d04b1d237f704729258234c471c8c4f617a1303042862f708ebbc6",
                    &[("bin/terraform", "terraform")],
                ),
                (
                    Platform::DARWIN_ARM64,
                    "https://releases.hashicorp.com/terraform/1.9.5/terraform_1.9.5_darwin_arm64.zip",
                    "sha256:b7eca5cd6f0f6644d45d8708c1b864e64a9e26c355d2c9b585faa049f640fe71",
                    &[("bin/terraform", "terraform")],
                ),
            ],
        )?,
        // https://github.com/foundry-rs/foundry/releases
        archive(
            FOUNDRY,
            "nightly-2b1f8d6dd90f9790faf0528e05e60e573a7569ce",
            &[
                (
                    Platform::LINUX_AMD64,
                    "https://github.com/foundry-rs/foundry/releases/download/nightly-2b1f8d6dd90f9790faf0528e05e60e573a7569ce/foundry_nightly_linux_amd64.tar.gz",
                    "sha256:2c75c62fab2a521938fd2a5eec6e97f9718eb0b6802852f54f1d886100fe8eb0",
                    foundry_links,
                ),
                (
                    Platform::DARWIN_AMD64,
                    "https://github.com/foundry-rs/foundry/releases/download/nightly-2b1f8d6dd90f9790faf0528e05e60e573a7569ce/foundry_nightly_darwin_amd64.tar.gz",
                    "sha256:cf853e416cf9358174bf4fcf603b5c263aed456842b9c78661c4d77654133b7a",
                    foundry_links,
                ),
                (
                    Platform::DARWIN_ARM64,
                    "https://github.com/foundry-rs/foundry/releases/download/nightly-2b1f8d6dd90f9790faf0528e05e60e573a7569ce/foundry_nightly_darwin_arm64.tar.gz",
                    "sha256:af157f6daac33bb4b955875e777c52d7d022e6471ed2bf1cddba9869ed5707f0",
                    foundry_links,
                ),
            ],
        )?,
        // https://github.com/protocolbuffers/protobuf/releases
        archive(
            PROTOC,
            "v25.0",
            &[
                (
                    Platform::LINUX_AMD64,
                    "https://github.com/protocolbuffers/protobuf/releases/download/v25.0/protoc-25.0-linux-x86_64.zip",
                    "sha256:d26c4efe0eae3066bb560625b33b8fc427f55bd35b16f246b7932dc851554e67",
                    &[("bin/protoc", "bin/protoc")],
                ),
                (
                    Platform::DARWIN_AMD64,
                    "https://github.com/protocolbuffers/protobuf/releases/download/v25.0/protoc-25.0-osx-x86_64.zip",
                    "sha256:15eefb30ba913e8dc4dd21d2ccb34ce04a2b33124f7d9460e5fd815a5d6459e3",
                    &[("bin/protoc", "bin/protoc")],
                ),
                (
                    Platform::DARWIN_ARM64,
                    "https://github.com/protocolbuffers/protobuf/releases/download/v25.0/protoc-25.0-osx-aarch_64.zip",
                    "sha256:76a997df5dacc0608e880a8e9069acaec961828a47bde16c06116ed2e570588b",
                    &[("bin/protoc", "bin/protoc")],
                ),
            ],
        )?,
        // https://github.com/protocolbuffers/protobuf-go/releases
        Arc::new(PackageTool::go(
            PROTOC_GEN_GO,
            "v1.34.2",
            "google.golang.org/protobuf/cmd/protoc-gen-go",
        )),
        // https://github.com/grpc/grpc-go/releases
        Arc::new(PackageTool::go(
            PROTOC_GEN_GO_GRPC,
            "v1.5.1",
            "google.golang.org/grpc/cmd/protoc-gen-go-grpc",
        )),
        // https://rust-lang.github.io/rustup/installation/other.html
        archive(
            RUSTUP_INIT,
            "1.27.1",
            &[
                (
                    Platform::LINUX_AMD64,
                    "https://static.rust-lang.org/rustup/dist/x86_64-unknown-linux-gnu/rustup-init",
                    "sha256:6aeece6993e902708983b209d04c0d1dbb14ebb405ddb87def578d41f920f56d",
                    &[("bin/rustup-init", "rustup-init")],
                ),
                (
                    Platform::DARWIN_AMD64,
                    "https://static.rust-lang.org/rustup/dist/x86_64-apple-darwin/rustup-init",
                    "sha256:f547d77c32d50d82b8228899b936bf2b3c72ce0a70fb3b364e7fba8891eba781",
                    &[("bin/rustup-init", "rustup-init")],
                ),
                (
                    Platform::DARWIN_ARM64,
                    "https://static.rust-lang.org/rustup/dist/aarch64-apple-darwin/rustup-init",
                    "sha256:760b18611021deee1a859c345d17200e0087d47f68dfe58278c57abe3a0d3dd0",
                    &[("bin/rustup-init", "rustup-init")],
                ),
            ],
        )?,
        // https://releases.rs
        Arc::new(RustToolchain::new("1.80.1")),
    ])
}

/// Build a registry holding the whole catalogue.
///
/// # Errors
///
/// Returns [`toolsmith_core::Error::DuplicateTool`] if two entries share a
/// name, or a configuration error for a malformed hash.
pub fn registry() -> Result<ToolRegistry> {
    ToolRegistry::from_tools(tools()?)
}
