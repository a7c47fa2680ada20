//! A hybrid stream cipher cascading AES-CTR (as a keystream generator only)
//! with XChaCha20-Poly1305, plus an optional outer HMAC-SHA-256 tag per
//! ciphertext chunk (Encrypt-then-MAC). Plaintext is partitioned into
//! fixed-size chunks and each chunk is sealed independently with fresh
//! random nonces, producing a self-delimiting ciphertext stream suitable for
//! pipes, files, sockets and database blobs.
//!
//! The [`transport`] and [`listener`] modules wrap the same framing around a
//! TLS 1.3 connection ("stream-over-TLS"), so the cipher doubles as an inner
//! encryption layer on top of an already-encrypted network connection.
//!
//! See `DESIGN.md` for where each piece of this crate is grounded.

mod error;
pub use error::*;

mod aes_ctr;
mod chunk;
mod digest;
mod stream;

pub mod config;
pub mod entropy;
pub mod listener;
pub mod session;
pub mod transport;

pub use entropy::Entropy;
pub use listener::Listener;
pub use session::Session;
pub use transport::Transport;
