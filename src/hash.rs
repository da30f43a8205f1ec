//! # Content Hashing
//!
//! Digests used as cache keys and integrity checks. Each algorithm is a
//! [`Hasher`] implementation holding exactly one digest context; there is no
//! shared or process-wide state.
//!
//! - MD5 derives cache keys and verifies the vanilla server jar.
//! - SHA-256 and SHA-512 verify third-party tool downloads.
//!
//! All digests are rendered as lowercase hexadecimal.

use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};

use crate::error::Result;

/// Incremental digest accumulation.
pub trait Hasher: Send {
    /// Feed more bytes into the running digest.
    fn update(&mut self, bytes: &[u8]) -> &mut dyn Hasher;

    /// Hex digest of everything fed so far. Resets the running state.
    fn digest(&mut self) -> String;

    /// One-shot digest of `bytes`, independent of the running state.
    fn digest_of(&self, bytes: &[u8]) -> String;
}

/// A [`Hasher`] backed by a RustCrypto digest.
pub struct DigestHasher<D: Digest> {
    context: D,
    _algorithm: PhantomData<fn() -> D>,
}

impl<D: Digest> DigestHasher<D> {
    pub fn new() -> Self {
        Self {
            context: D::new(),
            _algorithm: PhantomData,
        }
    }
}

impl<D: Digest> Default for DigestHasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Digest + Send + 'static> Hasher for DigestHasher<D> {
    fn update(&mut self, bytes: &[u8]) -> &mut dyn Hasher {
        Digest::update(&mut self.context, bytes);
        self
    }

    fn digest(&mut self) -> String {
        let finished = std::mem::replace(&mut self.context, D::new());
        hex::encode(finished.finalize())
    }

    fn digest_of(&self, bytes: &[u8]) -> String {
        hex::encode(D::digest(bytes))
    }
}

pub type Md5Hasher = DigestHasher<Md5>;
pub type Sha256Hasher = DigestHasher<Sha256>;
pub type Sha512Hasher = DigestHasher<Sha512>;

/// Supported digest algorithms, selected by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Create a fresh hasher for this algorithm.
    pub fn hasher(self) -> Box<dyn Hasher> {
        match self {
            HashAlgorithm::Md5 => Box::new(Md5Hasher::new()),
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher::new()),
            HashAlgorithm::Sha512 => Box::new(Sha512Hasher::new()),
        }
    }

    /// One-shot digest of a buffer.
    pub fn digest_of(self, bytes: &[u8]) -> String {
        self.hasher().digest_of(bytes)
    }

    /// Stream a file through the algorithm.
    pub fn hash_file(self, path: &Path) -> Result<String> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = self.hasher();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(hasher.digest())
    }

    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }
}
