//! TLS provider layer
//!
//! This module wraps the platform TLS stack (OpenSSL) behind the traits the
//! upgrade factory is written against.
//!
//! # Architecture
//!
//! 1. `TlsConfig` builds an `OpenSslProvider` (versions, ciphers, trust,
//!    timeouts, session cache)
//! 2. `TlsProvider` creates sockets, either fresh to an address or in place
//!    over an existing `Transport`
//! 3. `ProviderSocket` takes SNI/protocol/ticket settings and performs the
//!    handshake, yielding a `TlsSession`
//!
//! # Features
//!
//! - TLS 1.0 through TLS 1.3 support (OpenSSL version dependent)
//! - Capability detection from the linked OpenSSL version
//! - SNI (Server Name Indication)
//! - ALPN (Application-Layer Protocol Negotiation)
//! - Session resumption through a client session cache
//! - Handshake timeouts
//!
//! # Examples
//!
//! ```no_run
//! use dispatch_tls::tls::{ProviderSocket, TlsConfig, TlsProvider};
//! use std::net::TcpStream;
//!
//! let provider = TlsConfig::client()
//!     .alpn(&["http/1.1"])
//!     .build()
//!     .unwrap();
//!
//! let tcp_stream = TcpStream::connect("203.0.113.5:443").unwrap();
//! let mut socket = provider
//!     .upgrade_in_place(tcp_stream, "api.example.com", 443, true)
//!     .unwrap();
//! socket.set_sni_hostname("api.example.com").unwrap();
//! let session = socket.handshake().unwrap();
//! println!("negotiated {}", session.vars().version);
//! ```

pub mod builtin_cert;
pub mod cache;
pub mod capability;
pub mod cert;
pub mod config;
pub mod provider;
pub mod session;
pub mod transport;
pub mod vars;

pub use cache::{SessionCache, SessionKey};
pub use capability::{SniSupport, TlsCapability};
pub use cert::{verify_hostname, CertInfo, PeerCertificate};
pub use config::{ClientConfigBuilder, TlsConfig, TlsError, TlsVersion};
pub use provider::{OpenSslProvider, PendingTls, ProviderSocket, TlsProvider};
pub use session::TlsSession;
pub use transport::{Carrier, Transport};
pub use vars::TlsVars;

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
