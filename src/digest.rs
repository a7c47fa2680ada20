//! The digest computation (C5): a storage-at-rest integrity receipt over an
//! entire plaintext or ciphertext stream, independent of the per-chunk HMAC
//! tags produced during encryption.
//!
//! Preserves a specific keying quirk rather than "fixing" it: the digest's
//! HMAC is not keyed with the session's configured HMAC key directly, but
//! with that key's own HMAC-SHA-256 self-digest (i.e. the key is first run
//! once through an HMAC instance keyed with itself, and the resulting tag
//! becomes the key for the real digest). This only changes the effective key
//! material, not the security argument, but callers who precompute digests
//! out-of-band must reproduce it bit-exactly. See `DESIGN.md`.

use std::io::Read;

use hmac::Mac;

use crate::error::Error;
use crate::session::{HmacSha256, Session};

/// Computes the integrity receipt over every byte read from `src`, or
/// returns `None` if HMAC isn't enabled on `session`.
pub(crate) fn digest<R: Read>(session: &mut Session, mut src: R) -> Result<Option<[u8; 32]>, Error> {
    let Some(existing) = session.hmac.as_mut() else {
        return Ok(None);
    };

    let key = existing.clone().finalize_reset().into_bytes();
    let mut keyed = HmacSha256::new_from_slice(&key).expect("HMAC accepts a key of any length");

    let mut buf = [0u8; 8192];
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        keyed.update(&buf[..n]);
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&keyed.finalize().into_bytes());
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn none_when_hmac_disabled() {
        let mut session = Session::new(&[1u8; 16], &[2u8; 32]).unwrap();
        let result = digest(&mut session, Cursor::new(b"anything".to_vec())).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn deterministic_for_fixed_key_and_input() {
        let mut a = Session::new(&[1u8; 16], &[2u8; 32]).unwrap();
        a.enable_hmac(b"receipt key");
        let mut b = Session::new(&[9u8; 16], &[8u8; 32]).unwrap();
        b.enable_hmac(b"receipt key");

        let da = digest(&mut a, Cursor::new(b"same content".to_vec())).unwrap();
        let db = digest(&mut b, Cursor::new(b"same content".to_vec())).unwrap();

        assert_eq!(da, db);
        assert!(da.is_some());
    }

    #[test]
    fn differs_across_hmac_keys() {
        let mut a = Session::new(&[1u8; 16], &[2u8; 32]).unwrap();
        a.enable_hmac(b"key one");
        let mut b = Session::new(&[1u8; 16], &[2u8; 32]).unwrap();
        b.enable_hmac(b"key two");

        let da = digest(&mut a, Cursor::new(b"same content".to_vec())).unwrap();
        let db = digest(&mut b, Cursor::new(b"same content".to_vec())).unwrap();

        assert_ne!(da, db);
    }

    #[test]
    fn differs_across_content() {
        let mut session_a = Session::new(&[1u8; 16], &[2u8; 32]).unwrap();
        session_a.enable_hmac(b"receipt key");
        let mut session_b = Session::new(&[1u8; 16], &[2u8; 32]).unwrap();
        session_b.enable_hmac(b"receipt key");

        let da = digest(&mut session_a, Cursor::new(b"content one".to_vec())).unwrap();
        let db = digest(&mut session_b, Cursor::new(b"content two".to_vec())).unwrap();

        assert_ne!(da, db);
    }
}
