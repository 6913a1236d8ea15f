//! Archive unpacking.
//!
//! Formats are detected from the source URL. Anything that is not a known
//! archive suffix is treated as a bare executable.

use flate2::read::GzDecoder;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::Path;
use tar::Archive;
use xz2::read::XzDecoder;

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.xz`
    TarXz,
    /// `.zip`
    Zip,
    /// A single executable
    Raw,
}

impl ArchiveFormat {
    /// Detect the format from a URL, ignoring query strings and fragments.
    #[must_use]
    pub fn detect(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Self::TarGz
        } else if path.ends_with(".tar.xz") {
            Self::TarXz
        } else if path.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Raw
        }
    }
}

/// File name a raw download is stored under: the last URL path segment.
#[must_use]
pub fn raw_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("download")
}

/// Unpack `data` into `dest`, which must not exist yet.
///
/// # Errors
///
/// Returns an I/O error if the data is not a valid archive of the given
/// format or the files cannot be written.
pub fn extract(format: ArchiveFormat, data: &[u8], dest: &Path, raw_name: &str) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    match format {
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(Cursor::new(data)), dest),
        ArchiveFormat::TarXz => unpack_tar(XzDecoder::new(Cursor::new(data)), dest),
        ArchiveFormat::Zip => unpack_zip(data, dest),
        ArchiveFormat::Raw => {
            let path = dest.join(raw_name);
            fs::write(&path, data)?;
            set_mode(&path, 0o755)
        }
    }
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> io::Result<()> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive.unpack(dest)
}

fn unpack_zip(data: &[u8], dest: &Path) -> io::Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(io::Error::other)?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(io::Error::other)?;
        let Some(relative) = file.enclosed_name() else {
            continue;
        };
        let outpath = dest.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        fs::write(&outpath, &content)?;
        if let Some(mode) = file.unix_mode() {
            set_mode(&outpath, mode & 0o7777)?;
        }
    }
    Ok(())
}

fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}
