//! The TLS listener (C7): accepts raw TCP connections, upgrades each to TLS
//! 1.3 eagerly, and hands back a [`Transport`] sharing one [`Session`] across
//! every accepted connection.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use tracing::{debug, warn};

use crate::config::crypto_provider;
use crate::error::Error;
use crate::session::Session;
use crate::transport::Transport;

/// A TLS 1.3 listener bound to a single address, serving a single server
/// certificate and sharing a single [`Session`] across every connection it
/// accepts.
///
/// One `Session` per listener, not per connection, because the spec this
/// crate implements treats the listener as guarding one logical encrypted
/// channel that happens to have many concurrent transport legs; see
/// `DESIGN.md` for the concurrency model this implies for the HMAC layer.
pub struct Listener {
    inner: TcpListener,
    tls_config: Arc<ServerConfig>,
    session: Arc<Mutex<Session>>,
}

impl Listener {
    /// Binds `addr` and builds a TLS-1.3-only server configuration from
    /// `certs` and `key`. `session` is wrapped in an `Arc<Mutex<_>>` and
    /// shared by every [`Transport`] this listener accepts.
    pub fn bind(
        addr: SocketAddr,
        certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
        session: Session,
    ) -> Result<Self, Error> {
        let tls_config = ServerConfig::builder_with_provider(crypto_provider())
            .with_protocol_versions(&[&rustls::version::TLS13])
            .map_err(Error::Tls)?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(Error::Tls)?;

        Ok(Self {
            inner: TcpListener::bind(addr)?,
            tls_config: Arc::new(tls_config),
            session: Arc::new(Mutex::new(session)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accepts one TCP connection and performs the TLS 1.3 handshake before
    /// returning, so a non-TLS or malformed `ClientHello` (for example a
    /// plain HTTP request hitting this port) surfaces here as
    /// [`Error::RecordHeader`] instead of on the caller's first read or
    /// write.
    pub fn accept(&self) -> Result<Transport, Error> {
        let (socket, peer) = self.inner.accept()?;
        socket.set_nodelay(true).ok();
        debug!(%peer, "accepted tcp connection, starting tls handshake");

        let conn = ServerConnection::new(Arc::clone(&self.tls_config)).map_err(Error::Tls)?;
        let mut tls = StreamOwned::new(conn, socket);

        if let Err(e) = tls.conn.complete_io(&mut tls.sock) {
            let err = classify_handshake_error(e);
            warn!(%peer, %err, "tls handshake failed");
            return Err(err);
        }

        debug!(%peer, "tls handshake complete");
        Ok(Transport::new_server(tls, Arc::clone(&self.session)))
    }
}

/// Maps a handshake-time I/O error to the crate's error surface, folding
/// corrupt or invalid `ClientHello` records into [`Error::RecordHeader`]
/// rather than surfacing the underlying `rustls::Error` variant, since from
/// the listener's point of view both mean the same thing: whatever arrived
/// on the socket wasn't a TLS record.
fn classify_handshake_error(e: io::Error) -> Error {
    if let Some(inner) = e
        .get_ref()
        .and_then(|r| r.downcast_ref::<rustls::Error>())
    {
        return match inner {
            rustls::Error::CorruptMessage | rustls::Error::InvalidMessage(_) => {
                Error::RecordHeader
            }
            other => Error::Tls(other.clone()),
        };
    }
    Error::Io(e)
}
