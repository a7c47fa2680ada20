//! The stream driver (C4): turns the single-chunk codec in [`crate::chunk`]
//! into a whole-stream encrypt/decrypt loop over arbitrary `Read`/`Write`
//! implementations (files, pipes, sockets, in-memory buffers).

use std::io::{Read, Write};

use crate::chunk;
use crate::config::CHUNK_SIZE;
use crate::error::Error;
use crate::session::Session;

/// Reads `src` to completion in fixed-size chunks, sealing and writing each
/// one to `dst`. A short final read (including zero bytes beyond an already
/// chunk-aligned stream) ends the loop cleanly; an empty `src` produces an
/// empty `dst`, not a single empty chunk.
pub(crate) fn encrypt<R: Read, W: Write>(
    session: &mut Session,
    mut src: R,
    mut dst: W,
) -> Result<(), Error> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        chunk::encrypt_and_write(session, &buf[..n], &mut dst)?;
    }
}

/// Reads framed chunks from `src` until a clean end-of-stream, decrypting
/// each into `dst`. A framing or authentication error on any chunk aborts
/// the loop immediately; bytes from chunks already written to `dst` before
/// the failing chunk are not rolled back.
pub(crate) fn decrypt<R: Read, W: Write>(
    session: &mut Session,
    mut src: R,
    mut dst: W,
) -> Result<(), Error> {
    loop {
        match chunk::read_and_decrypt(session, &mut src)? {
            Some(plaintext) => dst.write_all(&plaintext)?,
            None => return Ok(()),
        }
    }
}
