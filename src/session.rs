//! The session (C2): the keyed cipher state shared by the chunk codec, the
//! stream driver and the digest computation.

use std::io::{Read, Write};

use chacha20poly1305::{KeyInit, XChaCha20Poly1305};
use hmac::Hmac;
use sha2::Sha256;

use crate::aes_ctr::BlockCipherKey;
use crate::config::{CHACHA_KEY_LEN, DEFAULT_NONCE_GROWTH};
use crate::digest;
use crate::error::Error;
use crate::stream;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// A `Session` holds the keyed cipher state for the hybrid AES-CTR /
/// XChaCha20-Poly1305 scheme: a block cipher used only as a CTR keystream
/// generator, an XChaCha20-Poly1305 AEAD, and an optional HMAC-SHA-256 layer
/// added on top (Encrypt-then-MAC).
///
/// A session is immutable with respect to its keys after construction;
/// enabling HMAC is the only supported mutation. The keys are never exposed
/// again once built, and are zeroised on drop.
///
/// A session is intended for use by at most one encryption stream and at
/// most one decryption stream at a time. Sharing one across multiple
/// concurrent streams (e.g. many accepted [`crate::transport::Transport`]
/// connections) is supported only if the caller externally serializes
/// access, because the HMAC state is reset and refilled per chunk; see
/// `DESIGN.md`.
pub struct Session {
    pub(crate) block_cipher: BlockCipherKey,
    pub(crate) aead: XChaCha20Poly1305,
    pub(crate) hmac: Option<HmacSha256>,
    pub(crate) nonce_capacity: (f64, f64),
}

impl Session {
    /// Builds a session keyed with `aes_key` (16, 24 or 32 bytes) and
    /// `chacha_key` (exactly 32 bytes). HMAC is disabled until
    /// [`Session::enable_hmac`] is called.
    pub fn new(aes_key: &[u8], chacha_key: &[u8]) -> Result<Self, Error> {
        let block_cipher = BlockCipherKey::new(aes_key)?;

        if chacha_key.len() != CHACHA_KEY_LEN {
            return Err(Error::InvalidChachaKeySize);
        }
        let aead = XChaCha20Poly1305::new(chacha_key.into());

        Ok(Self {
            block_cipher,
            aead,
            hmac: None,
            nonce_capacity: (DEFAULT_NONCE_GROWTH, DEFAULT_NONCE_GROWTH),
        })
    }

    /// Installs an HMAC-SHA-256 keyed hasher, enabling the outer integrity
    /// tag on every chunk sealed or opened from this point forward. `key` may
    /// be of any length (RFC 2104; keys longer than the hash's block size are
    /// pre-hashed internally).
    pub fn enable_hmac(&mut self, key: &[u8]) {
        self.hmac =
            Some(HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length"));
    }

    /// Whether HMAC is currently enabled on this session.
    pub fn hmac_enabled(&self) -> bool {
        self.hmac.is_some()
    }

    /// Tunes the backing capacity fraction used when growing the internal
    /// nonce buffers. Present to match the source API surface; it affects
    /// neither nonce length nor the security of the scheme (see
    /// `DESIGN.md`).
    pub fn customize_nonce_capacity(&mut self, aes_growth: f64, chacha_growth: f64) {
        self.nonce_capacity = (aes_growth, chacha_growth);
    }

    /// Reads `src` in fixed-size chunks, sealing and writing each one to
    /// `dst`. The final chunk may be shorter than `CHUNK_SIZE` and is sealed
    /// identically, without padding.
    pub fn encrypt<R: Read, W: Write>(&mut self, src: R, dst: W) -> Result<(), Error> {
        stream::encrypt(self, src, dst)
    }

    /// Reads framed chunks from `src`, decrypting each into `dst`. Stops
    /// cleanly on end-of-stream at a chunk boundary; an end-of-stream
    /// mid-chunk surfaces as the appropriate framing error.
    pub fn decrypt<R: Read, W: Write>(&mut self, src: R, dst: W) -> Result<(), Error> {
        stream::decrypt(self, src, dst)
    }

    /// Computes a storage-at-rest integrity receipt over every byte of
    /// `src`, or `None` if HMAC isn't enabled. Independent of the per-chunk
    /// HMAC tags: see [`crate::digest`] for the (intentionally preserved)
    /// keying quirk.
    pub fn digest<R: Read>(&mut self, src: R) -> Result<Option<[u8; 32]>, Error> {
        digest::digest(self, src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_aes_key_length() {
        let err = Session::new(&[0u8; 10], &[0u8; 32]).unwrap_err();
        assert_eq!(err.to_string(), "Hybrid Scheme: Invalid AES-CTR key size");
    }

    #[test]
    fn rejects_bad_chacha_key_length() {
        let err = Session::new(&[0u8; 32], &[0u8; 10]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Hybrid Scheme: Invalid XChaCha20-Poly1305 key size"
        );
    }

    #[test]
    fn hmac_disabled_by_default() {
        let session = Session::new(&[0u8; 32], &[0u8; 32]).unwrap();
        assert!(!session.hmac_enabled());
    }

    #[test]
    fn enabling_hmac_flips_the_flag() {
        let mut session = Session::new(&[0u8; 32], &[0u8; 32]).unwrap();
        session.enable_hmac(b"some key");
        assert!(session.hmac_enabled());
    }
}
