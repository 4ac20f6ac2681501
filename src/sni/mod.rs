//! SNI-aware TLS upgrade for dispatched connections
//!
//! An HTTP client that connects by IP address (after dispatch or load
//! balancing) still has to handshake and validate certificates against the
//! server's business hostname. This module provides the two pieces the HTTP
//! layer plugs in for that:
//!
//! - [`UpgradeFactory`] upgrades the plaintext transport to TLS with SNI
//!   forced to the business host, picking the in-place or fresh-socket path
//!   from the provider's [`TlsCapability`](crate::tls::TlsCapability)
//! - [`IdentityAdapter`] verifies the resulting session against the business
//!   host instead of the IP address the HTTP layer connected to
//!
//! Both expose the same [`PoolKey`], which decides whether two request
//! configurations may share a pooled connection.
//!
//! # Examples
//!
//! ```no_run
//! use dispatch_tls::sni::{HostnameVerifier, IdentityAdapter, UpgradeFactory};
//! use dispatch_tls::tls::TlsConfig;
//! use std::net::TcpStream;
//!
//! let provider = TlsConfig::client().build().unwrap();
//! let factory = UpgradeFactory::new("api.example.com", provider);
//! let adapter = IdentityAdapter::new("api.example.com");
//!
//! let transport = TcpStream::connect("203.0.113.5:443").unwrap();
//! match factory.upgrade(transport, "203.0.113.5", 443, true) {
//!     Ok(session) => assert!(adapter.verify("203.0.113.5", &session)),
//!     Err(e) => {
//!         // Retry through a plain hostname-based connection
//!         eprintln!("upgrade failed ({:?}): {}", e.kind(), e);
//!     }
//! }
//! ```

pub mod error;
pub mod factory;
pub mod key;
pub mod verifier;

pub use error::{UpgradeError, UpgradeErrorKind};
pub use factory::{UpgradeFactory, Upgraded};
pub use key::PoolKey;
pub use verifier::{DefaultHostnameVerifier, HostnameVerifier, IdentityAdapter};
