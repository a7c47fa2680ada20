//! The AES-CTR pre-encryption layer. The block cipher is used exclusively as
//! a keystream generator (counter mode): length-preserving, no integrity of
//! its own. Integrity is provided entirely by the outer XChaCha20-Poly1305
//! AEAD (and, optionally, the HMAC layer above that).

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::{Aes128, Aes192, Aes256};
use ctr::Ctr128BE;
use zeroize::Zeroize;

use crate::config::AES_NONCE_LEN;
use crate::error::Error;

type Aes128Ctr = Ctr128BE<Aes128>;
type Aes192Ctr = Ctr128BE<Aes192>;
type Aes256Ctr = Ctr128BE<Aes256>;

/// A keyed AES-CTR keystream generator. Holds only the key; every chunk
/// supplies its own fresh 128-bit IV, which is why this type exposes no
/// running state of its own and can be shared behind `&self`.
pub(crate) enum BlockCipherKey {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

impl BlockCipherKey {
    /// Builds a keyed AES-CTR generator. `key` must be 16, 24 or 32 bytes.
    pub(crate) fn new(key: &[u8]) -> Result<Self, Error> {
        match key.len() {
            16 => Ok(Self::Aes128(key.try_into().expect("checked length"))),
            24 => Ok(Self::Aes192(key.try_into().expect("checked length"))),
            32 => Ok(Self::Aes256(key.try_into().expect("checked length"))),
            _ => Err(Error::InvalidAesKeySize),
        }
    }

    /// XORs `buf` in place with the AES-CTR keystream seeded from `iv`. `iv`
    /// must never be reused with the same key: callers draw a fresh one per
    /// chunk from [`crate::entropy::Entropy`].
    pub(crate) fn apply_keystream(&self, iv: &[u8; AES_NONCE_LEN], buf: &mut [u8]) {
        match self {
            Self::Aes128(k) => Aes128Ctr::new(k.into(), iv.into()).apply_keystream(buf),
            Self::Aes192(k) => Aes192Ctr::new(k.into(), iv.into()).apply_keystream(buf),
            Self::Aes256(k) => Aes256Ctr::new(k.into(), iv.into()).apply_keystream(buf),
        }
    }
}

impl Drop for BlockCipherKey {
    fn drop(&mut self) {
        match self {
            Self::Aes128(k) => k.zeroize(),
            Self::Aes192(k) => k.zeroize(),
            Self::Aes256(k) => k.zeroize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_key_length() {
        assert!(matches!(
            BlockCipherKey::new(&[0u8; 20]),
            Err(Error::InvalidAesKeySize)
        ));
    }

    #[test]
    fn round_trips_for_every_key_size() {
        for len in [16, 24, 32] {
            let key = vec![0x42u8; len];
            let cipher = BlockCipherKey::new(&key).unwrap();
            let iv = [0x24u8; AES_NONCE_LEN];

            let plaintext = b"hybrid stream cipher payload".to_vec();
            let mut buf = plaintext.clone();
            cipher.apply_keystream(&iv, &mut buf);
            assert_ne!(buf, plaintext);

            cipher.apply_keystream(&iv, &mut buf);
            assert_eq!(buf, plaintext);
        }
    }
}
