//! The entropy source (C1): a capped reader of OS-backed random bytes.

use std::io::{self, Read};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::config::ENTROPY_READ_CAP;

/// A reader of cryptographically secure random bytes drawn from the
/// operating system's RNG, capped at [`ENTROPY_READ_CAP`] bytes per `read`
/// call. Backs nonce generation, and is suitable anywhere a bounded random
/// byte source is wanted.
///
/// `Entropy` is a zero-sized, stateless type: every `read` call draws fresh
/// bytes directly from the OS generator with no shared mutable state, so it
/// is safe to use concurrently from any number of threads without
/// synchronization.
#[derive(Debug, Default, Clone, Copy)]
pub struct Entropy;

impl Entropy {
    /// Constructs a new entropy reader. Cheap and side-effect free; construct
    /// one wherever random bytes are needed rather than sharing an instance.
    pub fn new() -> Self {
        Self
    }
}

impl Read for Entropy {
    /// Fills at most `min(buf.len(), 32)` bytes of `buf` with uniform random
    /// bytes. If `buf` is shorter than 32 bytes, fills `buf.len()` bytes.
    /// Failures from the OS generator are propagated unchanged.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(ENTROPY_READ_CAP);
        OsRng.try_fill_bytes(&mut buf[..n]).map_err(io::Error::other)?;
        Ok(n)
    }
}
