//! Established TLS sessions
//!
//! [`TlsSession`] wraps an OpenSSL `SslStream` after a completed handshake
//! and exposes plain `Read`/`Write` to the HTTP layer.

use super::cert::PeerCertificate;
use super::transport::Transport;
use super::vars::TlsVars;
use openssl::ssl::{SslRef, SslStream};
use openssl::x509::X509;
use std::io::{self, Read, Write};

/// TLS session over a transport
pub struct TlsSession<S: Read + Write> {
    stream: SslStream<S>,
    vars: TlsVars,
    failed: bool,
}

impl<S: Read + Write> TlsSession<S> {
    pub(crate) fn new(stream: SslStream<S>) -> Self {
        let vars = TlsVars::from_ssl(stream.ssl());
        TlsSession {
            stream,
            vars,
            failed: false,
        }
    }

    /// Variables captured after the handshake
    pub fn vars(&self) -> &TlsVars {
        &self.vars
    }

    /// Whether a read or write on the session failed
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// The OpenSSL connection
    pub fn ssl(&self) -> &SslRef {
        self.stream.ssl()
    }

    /// Get reference to underlying stream
    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Get mutable reference to underlying stream
    pub fn get_mut(&mut self) -> &mut S {
        self.stream.get_mut()
    }

    fn mark_failed(&mut self) {
        self.failed = true;
        self.vars.failed = true;
    }
}

impl<S: Transport> TlsSession<S> {
    /// Send close_notify and close the underlying stream
    pub fn close(&mut self) -> io::Result<()> {
        // Perform SSL shutdown if not failed
        if !self.failed {
            let _ = self.stream.shutdown();
        }

        self.stream.get_mut().close()
    }
}

impl<S: Read + Write> Read for TlsSession<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf).map_err(|e| {
            self.mark_failed();
            e
        })
    }
}

impl<S: Read + Write> Write for TlsSession<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf).map_err(|e| {
            self.mark_failed();
            e
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().map_err(|e| {
            self.mark_failed();
            e
        })
    }
}

impl<S: Read + Write> PeerCertificate for TlsSession<S> {
    fn peer_certificate(&self) -> Option<X509> {
        self.ssl().peer_certificate()
    }
}

impl<S: Read + Write> std::fmt::Debug for TlsSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSession")
            .field("version", &self.vars.version)
            .field("servername", &self.vars.servername)
            .field("failed", &self.failed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::builtin_cert::BUILTIN_CERT;
    use openssl::pkey::PKey;
    use openssl::ssl::{NameType, SslAcceptor, SslConnector, SslMethod, SslVerifyMode};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    fn acceptor() -> SslAcceptor {
        let cert = X509::from_pem(BUILTIN_CERT.as_bytes()).unwrap();
        let key = PKey::private_key_from_pem(BUILTIN_CERT.as_bytes()).unwrap();
        let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
        builder.set_certificate(&cert).unwrap();
        builder.set_private_key(&key).unwrap();
        builder.build()
    }

    #[test]
    fn test_session_read_write() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        let server_handle = thread::spawn(move || {
            let acceptor = acceptor();
            let (tcp_stream, _) = listener.accept().unwrap();
            let mut tls = acceptor.accept(tcp_stream).unwrap();
            tx.send(
                tls.ssl()
                    .servername(NameType::HOST_NAME)
                    .map(|s| s.to_string()),
            )
            .unwrap();

            let mut buf = [0u8; 5];
            tls.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"Hello");
            tls.write_all(b"World").unwrap();

            // Wait for the client's close_notify
            let mut rest = Vec::new();
            let _ = tls.read_to_end(&mut rest);
        });

        let mut connector = SslConnector::builder(SslMethod::tls_client()).unwrap();
        connector.set_verify(SslVerifyMode::NONE);
        let tcp_stream = TcpStream::connect(addr).unwrap();
        let stream = connector
            .build()
            .configure()
            .unwrap()
            .verify_hostname(false)
            .connect("api.example.com", tcp_stream)
            .unwrap();

        let mut session = TlsSession::new(stream);
        assert!(!session.failed());
        assert!(session.vars().version.contains("TLS"));
        assert_eq!(session.vars().servername.as_deref(), Some("api.example.com"));
        assert!(!session.vars().failed);
        assert!(!session.vars().sess_reused);
        assert!(session.peer_certificate().is_some());

        // A self-signed peer sends only its leaf
        let leaf = session.vars().cert(0).unwrap();
        assert_eq!(leaf.subject, "example.com");
        assert!(leaf.dns_names.iter().any(|n| n == "*.example.com"));
        assert!(session.vars().cert(1).is_none());

        session.write_all(b"Hello").unwrap();
        let mut buf = [0u8; 5];
        session.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"World");

        session.close().unwrap();
        server_handle.join().unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("api.example.com"));
    }
}
