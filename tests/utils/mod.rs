//! Loopback TLS origin for integration tests

use dispatch_tls::tls::builtin_cert::BUILTIN_CERT;
use openssl::pkey::PKey;
use openssl::ssl::{NameType, SslAcceptor, SslMethod, SslVersion};
use openssl::x509::X509;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// What the origin saw on one connection
#[derive(Debug)]
pub enum Seen {
    /// A plaintext connection the client closed without sending anything
    Plain { closed: bool },
    /// A TLS connection and the SNI it advertised
    Tls {
        servername: Option<String>,
        resumed: bool,
    },
    /// A TLS handshake the origin could not complete
    Failed,
}

pub struct Origin {
    pub port: u16,
    pub seen: Receiver<Seen>,
    pub handle: JoinHandle<()>,
}

fn acceptor(max_version: Option<SslVersion>) -> SslAcceptor {
    let cert = X509::from_pem(BUILTIN_CERT.as_bytes()).unwrap();
    let key = PKey::private_key_from_pem(BUILTIN_CERT.as_bytes()).unwrap();
    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    builder.set_certificate(&cert).unwrap();
    builder.set_private_key(&key).unwrap();
    builder.set_session_id_context(b"dispatch-tls-tests").unwrap();
    builder.set_max_proto_version(max_version).unwrap();
    builder.build()
}

/// Serve `plain` plaintext connections, then `tls` TLS connections
///
/// Each TLS connection answers "ping" with "pong", waits for the client's
/// close_notify and then writes "raw" on the bare TCP stream.
pub fn spawn_origin(plain: usize, tls: usize, max_version: Option<SslVersion>) -> Origin {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, seen) = mpsc::channel();

    let handle = thread::spawn(move || {
        let acceptor = acceptor(max_version);

        for _ in 0..plain {
            let (mut tcp_stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1];
            let closed = matches!(tcp_stream.read(&mut buf), Ok(0));
            tx.send(Seen::Plain { closed }).unwrap();
        }

        for _ in 0..tls {
            let (tcp_stream, _) = listener.accept().unwrap();
            let mut tls_stream = match acceptor.accept(tcp_stream) {
                Ok(stream) => stream,
                Err(_) => {
                    tx.send(Seen::Failed).unwrap();
                    continue;
                }
            };
            tx.send(Seen::Tls {
                servername: tls_stream
                    .ssl()
                    .servername(NameType::HOST_NAME)
                    .map(|s| s.to_string()),
                resumed: tls_stream.ssl().session_reused(),
            })
            .unwrap();

            let mut buf = [0u8; 4];
            if tls_stream.read_exact(&mut buf).is_ok() && &buf == b"ping" {
                tls_stream.write_all(b"pong").unwrap();
            }

            // Wait for the client's close_notify
            let mut rest = Vec::new();
            let _ = tls_stream.read_to_end(&mut rest);
            let _ = tls_stream.get_mut().write_all(b"raw");
        }
    });

    Origin { port, seen, handle }
}

/// Accept one connection and close it without a handshake
pub fn spawn_closing_origin() -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (tcp_stream, _) = listener.accept().unwrap();
        drop(tcp_stream);
    });

    (port, handle)
}
