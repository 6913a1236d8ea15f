//! Scoped container runs.

use crate::engine::{ContainerEngine, RunSpec};
use toolsmith_core::{Context, Result};
use tracing::{debug, info};

/// Unique container name: `<prefix>-<purpose>-<8 hex chars>`.
#[must_use]
pub fn container_name(prefix: &str, purpose: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{purpose}-{}", &id[..8])
}

/// `uid:gid` of the invoking user, so container output is not root-owned.
#[cfg(unix)]
#[must_use]
pub fn current_user() -> String {
    // SAFETY: getuid/getgid cannot fail and touch no memory.
    #[expect(unsafe_code, reason = "Required for POSIX identity queries")]
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    format!("{uid}:{gid}")
}

/// Run `spec` and remove the container afterwards, whatever the outcome.
///
/// Removal failures are logged; the run result is returned.
///
/// # Errors
///
/// Returns the engine's run error.
pub async fn run_scoped(ctx: &Context, engine: &dyn ContainerEngine, spec: &RunSpec) -> Result<()> {
    info!(container = %spec.name, image = %spec.image, "Starting container");
    let result = engine.run(ctx, spec).await;
    if let Err(e) = engine.remove(&spec.name).await {
        debug!(container = %spec.name, error = %e, "Container already removed");
    }
    result
}
