//! Content hashing.
//!
//! Declared source hashes carry their algorithm (`sha256:<hex>`); checksums
//! embedded in link names are bare lowercase hex.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Result};

/// Hash algorithm tag of a declared content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
}

impl HashAlgorithm {
    /// Hex digest of `data`.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => sha256_hex(data),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Algorithm-tagged content hash, e.g. `sha256:905a29...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    algorithm: HashAlgorithm,
    digest: String,
}

impl ContentHash {
    /// Hash `data` with SHA-256.
    #[must_use]
    pub fn sha256_of(data: &[u8]) -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            digest: sha256_hex(data),
        }
    }

    /// The algorithm tag.
    #[must_use]
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Lowercase hex digest.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Compare `data` against this hash, returning the actual hash on mismatch.
    pub fn verify(&self, data: &[u8]) -> std::result::Result<(), Self> {
        let actual = self.algorithm.digest(data);
        if actual == self.digest {
            Ok(())
        } else {
            Err(Self {
                algorithm: self.algorithm,
                digest: actual,
            })
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

impl FromStr for ContentHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (algorithm, digest) = s
            .split_once(':')
            .ok_or_else(|| Error::configuration(format!("hash '{s}' has no algorithm tag")))?;
        let algorithm = match algorithm {
            "sha256" => HashAlgorithm::Sha256,
            other => {
                return Err(Error::configuration(format!(
                    "unsupported hash algorithm '{other}'"
                )));
            }
        };
        if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::configuration(format!(
                "hash '{s}' is not a 64 character hex digest"
            )));
        }
        Ok(Self {
            algorithm,
            digest: digest.to_ascii_lowercase(),
        })
    }
}

/// Lowercase hex SHA-256 of a byte slice.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Lowercase hex SHA-256 of a file, following symlinks.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| Error::io(e, path, "open"))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| Error::io(e, path, "read"))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_parse_and_display() {
        let hash: ContentHash = format!("sha256:{EMPTY}").parse().unwrap();
        assert_eq!(hash.algorithm(), HashAlgorithm::Sha256);
        assert_eq!(hash.digest(), EMPTY);
        assert_eq!(hash.to_string(), format!("sha256:{EMPTY}"));
    }

    #[test]
    fn test_parse_normalizes_case() {
        let hash: ContentHash = format!("sha256:{}", EMPTY.to_uppercase()).parse().unwrap();
        assert_eq!(hash.digest(), EMPTY);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(EMPTY.parse::<ContentHash>().is_err());
        assert!("md5:abcd".parse::<ContentHash>().is_err());
        assert!("sha256:xyz".parse::<ContentHash>().is_err());
    }

    #[test]
    fn test_verify() {
        let hash = ContentHash::sha256_of(b"payload");
        assert!(hash.verify(b"payload").is_ok());
        let actual = hash.verify(b"tampered").unwrap_err();
        assert_eq!(actual, ContentHash::sha256_of(b"tampered"));
    }

    #[test]
    fn test_file_sha256_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(file_sha256(&path).unwrap(), EMPTY);
        assert_eq!(sha256_hex(b""), EMPTY);
    }

    #[test]
    fn test_file_sha256_missing_file() {
        let err = file_sha256(Path::new("/nonexistent/toolsmith/blob")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
