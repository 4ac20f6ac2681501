//! Hostname identity adapter
//!
//! The HTTP layer verifies the peer certificate against the host it
//! connected to, which for dispatched connections is an IP address.
//! [`IdentityAdapter`] ignores that host and checks the certificate against
//! the business host instead.

use super::key::PoolKey;
use crate::tls::{verify_hostname, PeerCertificate};

/// Certificate hostname check performed after a handshake
pub trait HostnameVerifier<S: ?Sized> {
    fn verify(&self, host: &str, session: &S) -> bool;
}

/// The provider's default check: the peer's leaf certificate must be valid
/// for `host`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHostnameVerifier;

impl<S: PeerCertificate + ?Sized> HostnameVerifier<S> for DefaultHostnameVerifier {
    fn verify(&self, host: &str, session: &S) -> bool {
        match session.peer_certificate() {
            Some(cert) => verify_hostname(&cert, host),
            None => false,
        }
    }
}

/// Verifies sessions against a fixed business host
#[derive(Debug, Clone)]
pub struct IdentityAdapter<V = DefaultHostnameVerifier> {
    business_host: String,
    verifier: V,
}

impl IdentityAdapter {
    pub fn new(business_host: impl Into<String>) -> Self {
        Self::with_verifier(business_host, DefaultHostnameVerifier)
    }
}

impl<V> IdentityAdapter<V> {
    /// Delegate the certificate check to `verifier`
    pub fn with_verifier(business_host: impl Into<String>, verifier: V) -> Self {
        IdentityAdapter {
            business_host: business_host.into(),
            verifier,
        }
    }

    pub fn business_host(&self) -> &str {
        &self.business_host
    }

    /// Connection pool compatibility key
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(self.business_host.clone())
    }
}

impl<S: ?Sized, V: HostnameVerifier<S>> HostnameVerifier<S> for IdentityAdapter<V> {
    /// `presented_host` is ignored.
    fn verify(&self, presented_host: &str, session: &S) -> bool {
        let verified = self.verifier.verify(&self.business_host, session);
        if !verified {
            log::warn!(
                "certificate not valid for {} (connected as {})",
                self.business_host,
                presented_host
            );
        }
        verified
    }
}

impl<V> PartialEq for IdentityAdapter<V> {
    fn eq(&self, other: &Self) -> bool {
        self.pool_key() == other.pool_key()
    }
}
