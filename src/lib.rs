//! dispatch-tls - SNI-aware TLS upgrade for IP-dispatched HTTPS connections
//!
//! This crate lets an HTTP client connect to a server by IP address while the
//! TLS handshake and certificate checks still target the server's business
//! hostname. The resulting connections carry a pool key so an HTTP layer can
//! decide which requests may share a pooled connection.
//!
//! - [`tls`] wraps the platform TLS provider (OpenSSL)
//! - [`sni`] holds the upgrade factory and the hostname identity adapter

pub mod sni;
pub mod tls;
