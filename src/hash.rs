// src/hash.rs

//! Hashing helpers for package identities and manifests
//!
//! - **SHA-256**: configuration fingerprints (package ids) and file digests
//!   recorded in package manifests
//! - **XXH128**: short, non-cryptographic names for store paths and lock files

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use xxhash_rust::xxh3::xxh3_128;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Xxh128,
}

impl HashAlgorithm {
    /// Get the algorithm name as a string
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Xxh128 => "xxh128",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A hex digest together with the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashValue {
    pub algorithm: HashAlgorithm,
    pub value: String,
}

impl HashValue {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Compute hash of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> HashValue {
    let value = match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(data);
            format!("{:x}", hasher.finalize())
        }
        HashAlgorithm::Xxh128 => format!("{:032x}", xxh3_128(data)),
    };
    HashValue { algorithm, value }
}

/// Compute the SHA-256 digest of a stream
pub fn sha256_reader<R: Read>(reader: &mut R) -> io::Result<HashValue> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(HashValue {
        algorithm: HashAlgorithm::Sha256,
        value: format!("{:x}", hasher.finalize()),
    })
}
