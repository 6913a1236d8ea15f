//! Atomic link installer.
//!
//! Artifacts are published through two symlinks:
//!
//! ```text
//! links/bin/go            -> go:<sha256>
//! links/bin/go:<sha256>   -> ../../download/<...>/go/bin/go
//! ```
//!
//! Both links are created under a temporary name and renamed into place, so
//! a reader following the stable link sees either the previous artifact or
//! the new one. Concurrent publishers of the same artifact write identical
//! links and converge without coordination.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::checksum;
use crate::{Error, Result};

/// Separator between a stable link name and its checksum.
pub const CHECKSUM_SEPARATOR: char = ':';

/// Path of the checksum-suffixed sibling of `stable`.
///
/// # Errors
///
/// Returns an error if `stable` has no file name.
pub fn checksum_link(stable: &Path, checksum: &str) -> Result<PathBuf> {
    let mut name = file_name(stable)?.to_os_string();
    name.push(CHECKSUM_SEPARATOR.to_string());
    name.push(checksum);
    Ok(stable.with_file_name(name))
}

/// Publish `artifact` at `stable`, recording `checksum` in the indirection.
///
/// The checksum link is written first and the stable link last, so a failure
/// at any point leaves the previous stable link untouched.
///
/// # Errors
///
/// Returns [`Error::Link`] if any filesystem step fails.
pub fn publish(artifact: &Path, stable: &Path, checksum: &str) -> Result<()> {
    let parent = stable
        .parent()
        .ok_or_else(|| Error::configuration(format!("{} has no parent", stable.display())))?;
    fs::create_dir_all(parent).map_err(|e| Error::link(e, stable))?;

    let suffixed = checksum_link(stable, checksum)?;
    let target = relative_to(artifact, parent).map_err(|e| Error::link(e, &suffixed))?;
    replace_symlink(&target, &suffixed)?;

    let indirection = PathBuf::from(file_name(&suffixed)?);
    replace_symlink(&indirection, stable)?;

    info!(path = %stable.display(), %checksum, "Binary installed to path");
    Ok(())
}

/// Checksum recorded in the stable link's indirection, if it has the expected shape.
#[must_use]
pub fn recorded_checksum(stable: &Path) -> Option<String> {
    let target = fs::read_link(stable).ok()?;
    if target.components().count() != 1 {
        return None;
    }
    let target_name = target.to_str()?;
    let stable_name = stable.file_name()?.to_str()?;
    let sum = target_name
        .strip_prefix(stable_name)?
        .strip_prefix(CHECKSUM_SEPARATOR)?;
    (!sum.is_empty()).then(|| sum.to_string())
}

/// Whether `stable` resolves to an artifact matching its recorded checksum.
///
/// Missing links, dangling links and drifted content all count as not
/// installed.
#[must_use]
pub fn is_installed(stable: &Path) -> bool {
    let Some(expected) = recorded_checksum(stable) else {
        debug!(path = %stable.display(), "Stable link missing or malformed");
        return false;
    };
    match checksum::file_sha256(stable) {
        Ok(actual) if actual == expected => true,
        Ok(actual) => {
            debug!(path = %stable.display(), %expected, %actual, "Checksum drift detected");
            false
        }
        Err(e) => {
            debug!(path = %stable.display(), error = %e, "Stable link does not resolve");
            false
        }
    }
}

/// Point `link` at `target` through a relative symlink.
///
/// Returns `false` without touching the filesystem when the link already
/// has the right target.
///
/// # Errors
///
/// Returns [`Error::Link`] if the link cannot be replaced.
pub fn link_into(target: &Path, link: &Path) -> Result<bool> {
    let parent = link
        .parent()
        .ok_or_else(|| Error::configuration(format!("{} has no parent", link.display())))?;
    let relative = relative_to(target, parent).map_err(|e| Error::link(e, link))?;

    if fs::read_link(link).is_ok_and(|current| current == relative) {
        return Ok(false);
    }

    fs::create_dir_all(parent).map_err(|e| Error::link(e, link))?;
    replace_symlink(&relative, link)?;
    debug!(link = %link.display(), target = %relative.display(), "Linked");
    Ok(true)
}

/// Atomically make `link` a symlink to `target`, replacing whatever is there.
///
/// # Errors
///
/// Returns [`Error::Link`] if the temporary link cannot be created or renamed.
pub fn replace_symlink(target: &Path, link: &Path) -> Result<()> {
    let mut tmp_name = OsString::from(".");
    tmp_name.push(file_name(link)?);
    tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    let tmp = link.with_file_name(tmp_name);

    std::os::unix::fs::symlink(target, &tmp).map_err(|e| Error::link(e, link))?;
    if let Err(e) = fs::rename(&tmp, link) {
        remove_if_exists(&tmp)?;
        return Err(Error::link(e, link));
    }
    Ok(())
}

/// Remove a file or link, treating an already absent path as success.
///
/// # Errors
///
/// Returns [`Error::Link`] for any failure other than the path not existing.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::link(e, path)),
    }
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .ok_or_else(|| Error::configuration(format!("{} has no file name", path.display())))
}

fn relative_to(target: &Path, base: &Path) -> std::io::Result<PathBuf> {
    let target = std::path::absolute(target)?;
    let base = std::path::absolute(base)?;
    pathdiff::diff_paths(&target, &base).ok_or_else(|| {
        std::io::Error::new(
            ErrorKind::InvalidInput,
            format!(
                "cannot express {} relative to {}",
                target.display(),
                base.display()
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact(dir: &TempDir, content: &[u8]) -> (PathBuf, String) {
        let path = dir.path().join("download/pkg/bin/tool");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        (path, checksum::sha256_hex(content))
    }

    #[test]
    fn test_checksum_link_name() {
        let link = checksum_link(Path::new("/x/links/bin/go"), "abc").unwrap();
        assert_eq!(link, PathBuf::from("/x/links/bin/go:abc"));
    }

    #[test]
    fn test_publish_creates_two_level_indirection() {
        let dir = TempDir::new().unwrap();
        let (artifact, sum) = artifact(&dir, b"tool v1");
        let stable = dir.path().join("links/bin/tool");

        publish(&artifact, &stable, &sum).unwrap();

        assert_eq!(
            fs::read_link(&stable).unwrap(),
            PathBuf::from(format!("tool:{sum}"))
        );
        let suffixed = checksum_link(&stable, &sum).unwrap();
        assert!(fs::read_link(&suffixed).unwrap().is_relative());
        assert_eq!(fs::read(&stable).unwrap(), b"tool v1");
        assert_eq!(recorded_checksum(&stable), Some(sum));
        assert!(is_installed(&stable));
    }

    #[test]
    fn test_publish_replaces_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let (artifact_path, first) = artifact(&dir, b"one");
        let stable = dir.path().join("links/bin/tool");
        publish(&artifact_path, &stable, &first).unwrap();

        let second_path = dir.path().join("download/other/tool");
        fs::create_dir_all(second_path.parent().unwrap()).unwrap();
        fs::write(&second_path, b"two").unwrap();
        let second = checksum::sha256_hex(b"two");
        publish(&second_path, &stable, &second).unwrap();

        assert_eq!(fs::read(&stable).unwrap(), b"two");
        assert_eq!(recorded_checksum(&stable), Some(second));
    }

    #[test]
    fn test_drift_is_detected() {
        let dir = TempDir::new().unwrap();
        let (artifact_path, sum) = artifact(&dir, b"original");
        let stable = dir.path().join("links/bin/tool");
        publish(&artifact_path, &stable, &sum).unwrap();

        fs::write(&artifact_path, b"corrupted").unwrap();
        assert!(!is_installed(&stable));

        fs::remove_file(&artifact_path).unwrap();
        assert!(!is_installed(&stable));
    }

    #[test]
    fn test_missing_or_foreign_links_are_not_installed() {
        let dir = TempDir::new().unwrap();
        let stable = dir.path().join("tool");
        assert!(!is_installed(&stable));

        fs::write(dir.path().join("plain"), b"x").unwrap();
        std::os::unix::fs::symlink("plain", &stable).unwrap();
        assert_eq!(recorded_checksum(&stable), None);
        assert!(!is_installed(&stable));
    }

    #[test]
    fn test_link_into_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("links/bin/tool");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"x").unwrap();
        let link = dir.path().join("platforms/linux-amd64/bin/tool");

        assert!(link_into(&target, &link).unwrap());
        let before = fs::symlink_metadata(&link).unwrap().modified().unwrap();
        assert!(!link_into(&target, &link).unwrap());
        let after = fs::symlink_metadata(&link).unwrap().modified().unwrap();
        assert_eq!(before, after);
        assert_eq!(fs::read(&link).unwrap(), b"x");
    }

    #[test]
    fn test_remove_if_exists_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        remove_if_exists(&dir.path().join("absent")).unwrap();
    }

    #[test]
    fn test_no_temporary_links_left_behind() {
        let dir = TempDir::new().unwrap();
        let (artifact_path, sum) = artifact(&dir, b"tidy");
        let stable = dir.path().join("links/bin/tool");
        publish(&artifact_path, &stable, &sum).unwrap();

        let leftovers: Vec<_> = fs::read_dir(stable.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
