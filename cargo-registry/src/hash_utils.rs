//! Cryptographic hashing utilities for package integrity verification

use sha2::{Digest, Sha256};
use std::io::{self, Read};

/// Calculate SHA256 hash of data.
///
/// Returns the digest as a lowercase hexadecimal string, the form used for
/// the `cksum` field of index entries.
///
/// # Examples
///
/// ```
/// # use cargo_registry::hash_utils::sha256_hash;
/// let hash = sha256_hash(b"hello world");
/// assert_eq!(hash.len(), 64);
/// ```
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Digest and length of a fully consumed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    pub sha256: String,
    pub size: u64,
}

/// Reader adapter that hashes and measures everything read through it.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    size: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            size: 0,
        }
    }

    /// Bytes read so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the wrapped reader together with the digest of the bytes
    /// read so far.
    pub fn finish(self) -> (R, ContentDigest) {
        let digest = ContentDigest {
            sha256: format!("{:x}", self.hasher.finalize()),
            size: self.size,
        };
        (self.inner, digest)
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.size += n as u64;
        Ok(n)
    }
}
