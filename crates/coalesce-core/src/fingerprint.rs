//! MD5 content fingerprints used to tell true duplicates from name clashes.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Read buffer size for hashing.
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// MD5 digest of a file's complete content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentFingerprint(pub [u8; 16]);

impl ContentFingerprint {
    /// Create a new fingerprint from raw digest bytes.
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Fingerprint an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::from_digest(&Md5::digest(data))
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(digest);
        Self::new(bytes)
    }

    /// Get the fingerprint as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the MD5 fingerprint of a file, reading all of it.
///
/// Only regular files (or symlinks to them) are read; pipes, sockets and
/// devices are rejected without being opened.
pub fn fingerprint_file(path: &Path) -> Result<ContentFingerprint> {
    let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
    if !metadata.is_file() {
        return Err(Error::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| Error::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentFingerprint::from_digest(&hasher.finalize()))
}
