//! S6: a TLS 1.3 stream-over-TLS round trip. A listener accepts one
//! connection on a self-signed certificate; a client connects, sends one
//! logical HTTP-shaped request through the adapter, and the server replies.
//! The bytes actually on the wire beneath TLS are framed chunks, not plain
//! HTTP — only the endpoints, which share session keys, can make sense of
//! them.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;

use cascadecrypt::{config::crypto_provider, Listener, Session, Transport};
use rcgen::generate_simple_self_signed;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore};

const AES_KEY: [u8; 32] = [0x11; 32];
const CHACHA_KEY: [u8; 32] = [0x22; 32];

fn build_session() -> Session {
    let mut session = Session::new(&AES_KEY, &CHACHA_KEY).unwrap();
    session.enable_hmac(b"s6 integration test hmac key");
    session
}

#[test]
fn tls_stream_carries_framed_chunks_end_to_end() {
    let certified = generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_der = certified.cert.der().clone();
    let key_der =
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = Listener::bind(addr, vec![cert_der.clone()], key_der, build_session()).unwrap();
    let server_addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let mut transport = listener.accept().unwrap();

        let mut request = vec![0u8; "GET /test".len()];
        transport.read_exact(&mut request).unwrap();
        assert_eq!(&request, b"GET /test");

        transport
            .write_all(b"Hello, World! (via TLS)")
            .unwrap();
    });

    let mut roots = RootCertStore::empty();
    roots.add(cert_der).unwrap();
    let client_config = ClientConfig::builder_with_provider(crypto_provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let server_name = ServerName::try_from("localhost").unwrap();
    let mut transport = Transport::connect(
        server_addr,
        Arc::new(client_config),
        server_name,
        Arc::new(std::sync::Mutex::new(build_session())),
    )
    .unwrap();

    transport.write_all(b"GET /test").unwrap();

    let mut response = vec![0u8; "Hello, World! (via TLS)".len()];
    transport.read_exact(&mut response).unwrap();
    assert_eq!(&response, b"Hello, World! (via TLS)");

    server.join().unwrap();
}

#[test]
fn raw_tcp_bytes_never_look_like_plain_http() {
    let certified = generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_der = certified.cert.der().clone();
    let key_der =
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = Listener::bind(addr, vec![cert_der], key_der, build_session()).unwrap();
    let server_addr = listener.local_addr().unwrap();

    // A plain (non-TLS) connection sending an HTTP-shaped request should
    // fail the handshake rather than being accepted as a valid session.
    let server = thread::spawn(move || {
        let result = listener.accept();
        assert!(result.is_err());
    });

    let mut raw = TcpStream::connect(server_addr).unwrap();
    raw.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .unwrap();
    drop(raw);

    server.join().unwrap();
}

/// A single `write_all` call bigger than the codec's `CHUNK_SIZE` must be
/// split across several sealed chunks rather than panicking or overflowing
/// the wire format's `u16` chunk-length prefix.
#[test]
fn write_larger_than_chunk_size_splits_cleanly_instead_of_panicking() {
    let certified = generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_der = certified.cert.der().clone();
    let key_der =
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = Listener::bind(addr, vec![cert_der.clone()], key_der, build_session()).unwrap();
    let server_addr = listener.local_addr().unwrap();

    let oversized: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
    let expected = oversized.clone();

    let server = thread::spawn(move || {
        let mut transport = listener.accept().unwrap();
        let mut received = vec![0u8; expected.len()];
        transport.read_exact(&mut received).unwrap();
        assert_eq!(received, expected);
    });

    let mut roots = RootCertStore::empty();
    roots.add(cert_der).unwrap();
    let client_config = ClientConfig::builder_with_provider(crypto_provider())
        .with_protocol_versions(&[&rustls::version::TLS13])
        .unwrap()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let server_name = ServerName::try_from("localhost").unwrap();
    let mut transport = Transport::connect(
        server_addr,
        Arc::new(client_config),
        server_name,
        Arc::new(std::sync::Mutex::new(build_session())),
    )
    .unwrap();

    transport.write_all(&oversized).unwrap();

    server.join().unwrap();
}
