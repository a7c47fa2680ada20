//! Named constants and the shared TLS crypto provider configuration.

use std::io::{self, BufRead};
use std::sync::Arc;

use rustls::crypto::aws_lc_rs as provider;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

/// Size of one plaintext chunk before framing overhead, in bytes.
pub const CHUNK_SIZE: usize = 1024;
/// AES-CTR IV length: a full 128-bit block used as the initial counter value.
pub const AES_NONCE_LEN: usize = 16;
/// XChaCha20-Poly1305 extended nonce length.
pub const CHACHA_NONCE_LEN: usize = 24;
/// Poly1305 authentication tag overhead added by the outer AEAD seal.
pub const POLY1305_TAG_LEN: usize = 16;
/// HMAC-SHA-256 tag length, when the optional outer HMAC layer is enabled.
pub const HMAC_TAG_LEN: usize = 32;
/// Length header on the wire: a big-endian `u16`.
pub const CHUNK_LEN_HEADER: usize = 2;
/// Exact length required of the XChaCha20-Poly1305 key.
pub const CHACHA_KEY_LEN: usize = 32;
/// Upper bound on a framed chunk's payload length (1024 + 16 + 16 + 32 = 1088);
/// always fits in a `u16`.
pub const MAX_CHUNK_LEN: usize = CHUNK_SIZE + AES_NONCE_LEN + POLY1305_TAG_LEN + HMAC_TAG_LEN;
/// Default backing-capacity growth fraction applied to the nonce buffers.
/// See `DESIGN.md` for why this knob has no effect on nonce length or security.
pub const DEFAULT_NONCE_GROWTH: f64 = 0.05;
/// Cap on how many random bytes [`crate::entropy::Entropy`] fills per `read` call.
pub const ENTROPY_READ_CAP: usize = 32;

/// Builds the crypto provider backing every TLS config in this crate, with
/// the curve preference order X25519, P-256, P-384, P-521.
///
/// `aws-lc-rs` is used instead of the more common `ring` provider because
/// `ring` doesn't implement the P-521 key exchange group this crate's curve
/// preferences call for.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    let mut provider = provider::default_provider();
    provider.kx_groups = vec![
        provider::kx_group::X25519,
        provider::kx_group::SECP256R1,
        provider::kx_group::SECP384R1,
        provider::kx_group::SECP521R1,
    ];
    Arc::new(provider)
}

/// Parses a PEM-encoded certificate chain, in the order callers typically
/// have it on disk (leaf first). A convenience for [`crate::Listener::bind`]
/// callers who keep their certificate material as PEM files rather than raw
/// DER; certificate and key *provisioning* (where the files live, how
/// they're rotated) stays the caller's responsibility.
pub fn parse_pem_certs(mut pem: impl BufRead) -> io::Result<Vec<CertificateDer<'static>>> {
    rustls_pemfile::certs(&mut pem).collect()
}

/// Parses the first PEM-encoded private key (PKCS#8, PKCS#1 or SEC1) found
/// in `pem`.
pub fn parse_pem_private_key(mut pem: impl BufRead) -> io::Result<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut pem)?
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "no private key found in PEM"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn parses_a_self_signed_cert_and_key_round_trip() {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert_pem = certified.cert.pem();
        let key_pem = certified.key_pair.serialize_pem();

        let certs = parse_pem_certs(Cursor::new(cert_pem)).unwrap();
        assert_eq!(certs.len(), 1);

        let key = parse_pem_private_key(Cursor::new(key_pem)).unwrap();
        assert!(matches!(key, PrivateKeyDer::Pkcs8(_)));
    }

    #[test]
    fn curve_preference_order_starts_with_x25519() {
        let provider = crypto_provider();
        assert_eq!(provider.kx_groups[0].name(), rustls::NamedGroup::X25519);
    }
}
