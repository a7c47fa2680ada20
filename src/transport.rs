//! The stream-over-TLS transport adapter (C6): wraps an established TLS 1.3
//! connection in the same chunked, authenticated framing used everywhere
//! else in this crate, so the hybrid cipher becomes an inner encryption
//! layer on top of an already-encrypted socket.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConnection, ClientConfig, ServerConnection, StreamOwned};
use tracing::warn;

use crate::chunk;
use crate::config::CHUNK_SIZE;
use crate::error::Error;
use crate::session::Session;

enum TlsConn {
    Server(StreamOwned<ServerConnection, TcpStream>),
    Client(StreamOwned<ClientConnection, TcpStream>),
}

impl TlsConn {
    fn socket(&self) -> &TcpStream {
        match self {
            Self::Server(s) => &s.sock,
            Self::Client(s) => &s.sock,
        }
    }
}

impl Read for TlsConn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Server(s) => s.read(buf),
            Self::Client(s) => s.read(buf),
        }
    }
}

impl Write for TlsConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Server(s) => s.write(buf),
            Self::Client(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Server(s) => s.flush(),
            Self::Client(s) => s.flush(),
        }
    }
}

/// A bidirectional, authenticated byte stream over an established TLS 1.3
/// connection. `Write` seals up to `CHUNK_SIZE` bytes of the call as one
/// chunk and flushes it through the TLS record layer immediately (writes
/// larger than `CHUNK_SIZE` are sealed across several calls, per the
/// ordinary `Write` short-write contract); `Read` pulls and decrypts one
/// framed chunk at a time, handing bytes out of an internal buffer until
/// it's drained.
///
/// Built from a [`Session`] shared (via `Arc<Mutex<_>>`) with every other
/// `Transport` accepted from the same [`crate::listener::Listener`], since
/// the HMAC layer's state must be externally serialized across concurrent
/// uses of one session; see `DESIGN.md`.
pub struct Transport {
    tls: TlsConn,
    session: Arc<Mutex<Session>>,
    read_buf: Vec<u8>,
    failed: bool,
}

impl Transport {
    pub(crate) fn new_server(
        tls: StreamOwned<ServerConnection, TcpStream>,
        session: Arc<Mutex<Session>>,
    ) -> Self {
        Self {
            tls: TlsConn::Server(tls),
            session,
            read_buf: Vec::new(),
            failed: false,
        }
    }

    /// Dials `addr`, performs a TLS 1.3 client handshake using `config` and
    /// `server_name`, and wraps the result with `session`.
    pub fn connect(
        addr: SocketAddr,
        config: Arc<ClientConfig>,
        server_name: ServerName<'static>,
        session: Arc<Mutex<Session>>,
    ) -> Result<Self, Error> {
        let socket = TcpStream::connect(addr)?;
        socket.set_nodelay(true).ok();
        let conn = ClientConnection::new(config, server_name)?;
        let tls = StreamOwned::new(conn, socket);
        Ok(Self {
            tls: TlsConn::Client(tls),
            session,
            read_buf: Vec::new(),
            failed: false,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tls.socket().local_addr()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.tls.socket().peer_addr()
    }

    pub fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.tls.socket().set_read_timeout(dur)
    }

    pub fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        self.tls.socket().set_write_timeout(dur)
    }

    /// Applies `dur` to both the read and write deadlines of the underlying
    /// socket. `std::net::TcpStream` has no single combined deadline the way
    /// the source API does, so this sets both independently; see
    /// `DESIGN.md`.
    pub fn set_deadline(&self, dur: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(dur)?;
        self.set_write_timeout(dur)
    }

    pub fn close(&self) -> io::Result<()> {
        self.tls.socket().shutdown(Shutdown::Both)
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.failed {
            return Err(io::Error::other("transport is in a failed state"));
        }
        if self.read_buf.is_empty() {
            let mut session = self.session.lock().expect("session mutex poisoned");
            match chunk::read_and_decrypt(&mut session, &mut self.tls) {
                Ok(Some(plaintext)) => self.read_buf = plaintext,
                Ok(None) => return Ok(0),
                Err(e) => {
                    warn!(err = %e, "transport read failed, marking connection failed");
                    self.failed = true;
                    return Err(io::Error::other(e));
                }
            }
        }
        let n = buf.len().min(self.read_buf.len());
        buf[..n].copy_from_slice(&self.read_buf[..n]);
        self.read_buf.drain(..n);
        Ok(n)
    }
}

impl Write for Transport {
    /// Seals up to `CHUNK_SIZE` bytes of `buf` as one logical chunk and
    /// flushes it through the TLS record layer. `buf` longer than
    /// `CHUNK_SIZE` is not an error: per the `Write` contract a single call
    /// is free to accept fewer bytes than it was given, so the caller (or
    /// `write_all`) simply calls again with the remainder, each call sealing
    /// its own chunk. This keeps every sealed payload within the wire
    /// format's `u16` length prefix without a separate bounds check here.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failed {
            return Err(io::Error::other("transport is in a failed state"));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(CHUNK_SIZE);
        let chunk = &buf[..n];
        {
            let mut session = self.session.lock().expect("session mutex poisoned");
            if let Err(e) = chunk::encrypt_and_write(&mut session, chunk, &mut self.tls) {
                self.failed = true;
                return Err(io::Error::other(e));
            }
        }
        self.tls.flush()?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tls.flush()
    }
}
