//! Streaming SHA-1 helpers for chunk integrity entries.
//!
//! Every chunk content entry is read through a [`HashingReader`], which
//! updates a digest as bytes pass through and publishes the final hex
//! digest into a [`SharedDigest`] slot once the wrapped source is
//! exhausted. The paired [`ChecksumEntry`] serves those hex bytes as its
//! own archive entry.
//!
//! A checksum entry has no content until its content entry has been read
//! to completion. Consuming the pair out of order is a serializer bug;
//! [`ChecksumEntry`] fails the read instead of producing stale or empty
//! bytes, so the violation surfaces loudly rather than as a silently
//! wrong checksum.

use std::io::{self, Read};
use std::sync::{Arc, OnceLock};

use sha1::{Digest, Sha1};

/// Length of a SHA-1 digest rendered as hex text.
pub const DIGEST_HEX_LEN: u64 = 40;

/// Write-once slot shared between a [`HashingReader`] and its
/// [`ChecksumEntry`].
#[derive(Clone, Default)]
pub struct SharedDigest(Arc<OnceLock<String>>);

impl SharedDigest {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The finalized hex digest, if the content has been fully read.
    pub fn hex(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }

    /// Whether the digest has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.0.get().is_some()
    }

    fn publish(&self, hex: String) {
        // A second finalization of the same slot is impossible by
        // construction; ignore the result rather than panic.
        let _ = self.0.set(hex);
    }
}

/// Reader adapter that hashes bytes as they pass through.
///
/// When the inner source reports end of stream, the digest is finalized
/// and published into the shared slot. The hash state is the only
/// buffering; chunk bytes are handed straight through.
pub struct HashingReader<R> {
    inner: R,
    hasher: Option<Sha1>,
    slot: SharedDigest,
}

impl<R: Read> HashingReader<R> {
    /// Wraps `inner`, publishing the final digest into `slot`.
    pub fn new(inner: R, slot: SharedDigest) -> Self {
        Self {
            inner,
            hasher: Some(Sha1::new()),
            slot,
        }
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            if let Some(hasher) = self.hasher.as_mut() {
                hasher.update(&buf[..n]);
            }
        } else if let Some(hasher) = self.hasher.take() {
            self.slot.publish(hex::encode(hasher.finalize()));
        }
        Ok(n)
    }
}

/// Byte source for a `.checksum` archive entry.
///
/// Serves the hex digest of the paired content entry. Reading before the
/// content entry has been exhausted is an ordering-contract violation
/// and fails with [`io::ErrorKind::InvalidData`].
pub struct ChecksumEntry {
    slot: SharedDigest,
    pos: usize,
}

impl ChecksumEntry {
    /// Creates the checksum entry for a previously registered slot.
    pub fn new(slot: SharedDigest) -> Self {
        Self { slot, pos: 0 }
    }
}

impl Read for ChecksumEntry {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let hex = self.slot.hex().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "checksum entry read before its content entry was fully consumed",
            )
        })?;
        let bytes = hex.as_bytes();
        if self.pos >= bytes.len() || buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(bytes.len() - self.pos);
        buf[..n].copy_from_slice(&bytes[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
