//! The chunk codec (C3): seals and opens one plaintext chunk to/from the
//! framed wire layout `[chunk_len: u16 BE][chacha_nonce: 24 bytes][payload]`.
//!
//! Layering: the wire framing and the AEAD/HMAC envelope belong to an inner
//! "XChaCha20Poly1305" codec layer (this module's read/write helpers and the
//! `XChacha20Poly1305:`-prefixed errors); the outer "Hybrid Scheme" layer
//! (the [`Session`] built around it) adds the AES-CTR pre-encryption pass and
//! its own redundant structural bounds checks (the `Hybrid Scheme:`-prefixed
//! errors) before delegating into this codec. Both layers live in this one
//! module because they share the same read loop; the two error prefixes are
//! what remain of that split.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chacha20poly1305::aead::Aead;
use hmac::Mac;
use subtle::ConstantTimeEq;
use tracing::trace;

use crate::config::{AES_NONCE_LEN, CHACHA_NONCE_LEN, CHUNK_SIZE, HMAC_TAG_LEN};
use crate::entropy::Entropy;
use crate::error::Error;
use crate::session::Session;

/// Encrypts one plaintext chunk, returning the fresh XChaCha20 nonce and the
/// sealed outer payload: AES-CTR pre-encryption under a fresh IV, then an
/// XChaCha20-Poly1305 seal over `aes_nonce ‖ aes_ctr_encrypt(plaintext)`.
/// Does not apply the optional outer HMAC tag or the length-prefixed wire
/// framing; see [`encrypt_and_write`] for that.
///
/// Fails with [`Error::ChunkTooLarge`] if `plaintext.len() > CHUNK_SIZE`,
/// rather than producing a sealed payload the wire format's `u16` length
/// prefix couldn't encode.
pub(crate) fn encrypt_chunk(
    session: &Session,
    plaintext: &[u8],
) -> Result<([u8; CHACHA_NONCE_LEN], Vec<u8>), Error> {
    if plaintext.len() > CHUNK_SIZE {
        return Err(Error::ChunkTooLarge);
    }

    let mut aes_nonce = [0u8; AES_NONCE_LEN];
    Entropy::new().read_exact(&mut aes_nonce)?;

    let mut inner = plaintext.to_vec();
    session.block_cipher.apply_keystream(&aes_nonce, &mut inner);

    let mut inner_with_iv = Vec::with_capacity(AES_NONCE_LEN + inner.len());
    inner_with_iv.extend_from_slice(&aes_nonce);
    inner_with_iv.extend_from_slice(&inner);

    let mut chacha_nonce = [0u8; CHACHA_NONCE_LEN];
    Entropy::new().read_exact(&mut chacha_nonce)?;

    let outer = session
        .aead
        .encrypt((&chacha_nonce).into(), inner_with_iv.as_ref())
        .map_err(|_| Error::AeadAuthenticationFailed)?;

    Ok((chacha_nonce, outer))
}

/// Seals one plaintext chunk and writes it to `dst` as
/// `[chunk_len: u16 BE][chacha_nonce: 24 bytes][payload]`, where `payload` is
/// the sealed outer ciphertext, followed by a 32-byte HMAC tag when HMAC is
/// enabled on `session`.
pub(crate) fn encrypt_and_write<W: Write>(
    session: &mut Session,
    plaintext: &[u8],
    mut dst: W,
) -> Result<(), Error> {
    let (chacha_nonce, mut outer) = encrypt_chunk(session, plaintext)?;

    if let Some(hmac) = session.hmac.as_mut() {
        hmac.reset();
        hmac.update(&outer);
        let tag = hmac.finalize_reset().into_bytes();
        outer.extend_from_slice(&tag);
    }

    // `encrypt_chunk`'s own bound on `plaintext.len()` makes this always fit
    // a `u16` in practice (max 1088 bytes); still checked rather than
    // `expect`ed, since a panic here would violate this crate's
    // exception-free failure path guarantee.
    let chunk_len: u16 = outer.len().try_into().map_err(|_| Error::ChunkTooLarge)?;

    dst.write_u16::<BigEndian>(chunk_len)?;
    dst.write_all(&chacha_nonce)?;
    dst.write_all(&outer)?;

    Ok(())
}

/// Reads one framed chunk from `src`, verifies it (HMAC first when enabled,
/// then the AEAD tag — Encrypt-then-MAC), and returns the decrypted
/// plaintext. Returns `Ok(None)` on a clean end-of-stream at a chunk
/// boundary (no byte of the next header was read).
pub(crate) fn read_and_decrypt<R: Read>(
    session: &mut Session,
    mut src: R,
) -> Result<Option<Vec<u8>>, Error> {
    let mut len_buf = [0u8; 2];
    match read_partial(&mut src, &mut len_buf)? {
        0 => return Ok(None),
        2 => {}
        _ => return Err(Error::UnexpectedChunkSize),
    }
    let chunk_len = u16::from_be_bytes(len_buf) as usize;

    let mut chacha_nonce = [0u8; CHACHA_NONCE_LEN];
    src.read_exact(&mut chacha_nonce)
        .map_err(|_| Error::UnexpectedNonceSize)?;

    let mut outer = vec![0u8; chunk_len];
    let hmac_enabled = session.hmac.is_some();
    src.read_exact(&mut outer).map_err(|_| {
        if hmac_enabled {
            Error::InvalidHmacTagSizeInner
        } else {
            Error::SizeMismatchInner
        }
    })?;

    if let Some(hmac) = session.hmac.as_mut() {
        if outer.len() < HMAC_TAG_LEN {
            return Err(Error::InvalidHmacTagSize);
        }
        let split_at = outer.len() - HMAC_TAG_LEN;
        let (payload, tag) = outer.split_at(split_at);

        hmac.reset();
        hmac.update(payload);
        let expected = hmac.finalize_reset().into_bytes();

        if expected.as_slice().ct_eq(tag).unwrap_u8() != 1 {
            trace!("hmac tag mismatch on incoming chunk");
            return Err(Error::HmacVerificationFailed);
        }

        let new_len = split_at;
        outer.truncate(new_len);
    } else if outer.len() != chunk_len {
        return Err(Error::SizeMismatch);
    }

    let inner_with_iv = session
        .aead
        .decrypt((&chacha_nonce).into(), outer.as_ref())
        .map_err(|_| Error::AeadAuthenticationFailed)?;

    if inner_with_iv.len() < AES_NONCE_LEN {
        return Err(Error::AeadAuthenticationFailed);
    }
    let (aes_nonce, inner) = inner_with_iv.split_at(AES_NONCE_LEN);
    let aes_nonce: [u8; AES_NONCE_LEN] = aes_nonce.try_into().expect("checked length above");

    let mut plaintext = inner.to_vec();
    session.block_cipher.apply_keystream(&aes_nonce, &mut plaintext);

    Ok(Some(plaintext))
}

/// Reads into `buf` until it's full or EOF, returning the number of bytes
/// actually read. Unlike `read_exact`, a short read below `buf.len()` isn't
/// an error here — the caller distinguishes "EOF before any byte" (clean
/// end-of-stream) from "EOF mid-header" (a framing error) itself.
fn read_partial<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match src.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
