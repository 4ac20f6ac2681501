//! TLS upgrade factory
//!
//! [`UpgradeFactory`] upgrades a plaintext transport, usually connected to a
//! dispatched IP address, to TLS while advertising the business host through
//! SNI. The handshake completes before `upgrade` returns, so the certificate
//! is negotiated for the business host and never for the literal address.

use super::error::UpgradeError;
use super::key::PoolKey;
use crate::tls::{ProviderSocket, SniSupport, TlsCapability, TlsError, TlsProvider, Transport};
use std::sync::atomic::{AtomicBool, Ordering};

/// Stream returned by a successful upgrade through provider `P`
pub type Upgraded<P, T> = <<P as TlsProvider<T>>::Socket as ProviderSocket>::Stream;

/// Upgrades transports to TLS for one business host
pub struct UpgradeFactory<P> {
    business_host: String,
    provider: P,
    exception_occurred: AtomicBool,
}

impl<P> UpgradeFactory<P> {
    pub fn new(business_host: impl Into<String>, provider: P) -> Self {
        UpgradeFactory {
            business_host: business_host.into(),
            provider,
            exception_occurred: AtomicBool::new(false),
        }
    }

    /// Host used for SNI and certificate validation
    pub fn business_host(&self) -> &str {
        &self.business_host
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether any upgrade through this factory has failed
    ///
    /// Best-effort telemetry. Concurrent upgrades may race on it; the
    /// returned [`UpgradeError`] is the authoritative signal.
    pub fn exception_occurred(&self) -> bool {
        self.exception_occurred.load(Ordering::Relaxed)
    }

    /// Connection pool compatibility key
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(self.business_host.clone())
    }

    /// Upgrade `transport` to TLS for the business host
    ///
    /// `target_host` is the host the HTTP layer connected to (typically the
    /// dispatched IP) and is only used for logging. With `auto_close` set the
    /// transport is closed or superseded on every path; without it the
    /// factory never closes the transport.
    ///
    /// No retry is attempted. On failure the caller is expected to fall back
    /// to a plain hostname-based connection.
    pub fn upgrade<T>(
        &self,
        transport: T,
        target_host: &str,
        port: u16,
        auto_close: bool,
    ) -> Result<Upgraded<P, T>, UpgradeError>
    where
        T: Transport,
        P: TlsProvider<T>,
    {
        if self.business_host.is_empty() {
            return Err(UpgradeError::Config);
        }

        let capability = self.provider.capability();
        log::info!(
            "upgrading {}:{} to TLS for {} ({:?})",
            target_host,
            port,
            self.business_host,
            capability
        );

        let result = match capability {
            TlsCapability::Native => self.upgrade_in_place(transport, port, auto_close),
            TlsCapability::Legacy(sni) => self.upgrade_fresh(transport, port, auto_close, sni),
        };

        result.map_err(|e| {
            self.exception_occurred.store(true, Ordering::Relaxed);
            log::warn!("TLS upgrade of {}:{} failed: {}", target_host, port, e);
            e
        })
    }

    fn upgrade_in_place<T>(
        &self,
        transport: T,
        port: u16,
        auto_close: bool,
    ) -> Result<Upgraded<P, T>, UpgradeError>
    where
        T: Transport,
        P: TlsProvider<T>,
    {
        let host = self.business_host.as_str();
        let fail = |e: TlsError| UpgradeError::handshake(host, e);

        let mut socket = self
            .provider
            .upgrade_in_place(transport, host, port, auto_close)
            .map_err(fail)?;
        socket.set_session_tickets(true).map_err(fail)?;
        let supported = socket.supported_protocols();
        socket.set_enabled_protocols(&supported).map_err(fail)?;
        log::debug!("setting SNI hostname {}", host);
        socket.set_sni_hostname(host).map_err(fail)?;

        socket.handshake().map_err(fail)
    }

    fn upgrade_fresh<T>(
        &self,
        mut transport: T,
        port: u16,
        auto_close: bool,
        sni: SniSupport,
    ) -> Result<Upgraded<P, T>, UpgradeError>
    where
        T: Transport,
        P: TlsProvider<T>,
    {
        let host = self.business_host.as_str();
        let fail = |e: TlsError| UpgradeError::handshake(host, e);

        let peer = transport.peer_addr();
        let closed = if auto_close {
            transport.close()
        } else {
            Ok(())
        };
        drop(transport);

        // The transport is gone before either error is reported
        let ip = peer.map_err(|e| fail(e.into()))?.ip();
        closed.map_err(|e| fail(e.into()))?;

        let documented = match sni {
            SniSupport::Documented => true,
            SniSupport::Probed => false,
            SniSupport::Unavailable => {
                return Err(UpgradeError::SniUnsupported {
                    host: host.to_string(),
                    source: None,
                })
            }
        };

        let mut socket = self.provider.new_socket(ip, port).map_err(fail)?;
        let supported = socket.supported_protocols();
        socket.set_enabled_protocols(&supported).map_err(fail)?;

        if documented {
            socket.set_session_tickets(true).map_err(fail)?;
            log::debug!("setting SNI hostname {}", host);
            socket.set_sni_hostname(host).map_err(fail)?;
        } else {
            log::debug!("no documented SNI support, probing for {}", host);
            socket
                .probe_sni_hostname(host)
                .map_err(|e| UpgradeError::SniUnsupported {
                    host: host.to_string(),
                    source: Some(e),
                })?;
        }

        socket.handshake().map_err(fail)
    }
}

impl<P> PartialEq for UpgradeFactory<P> {
    fn eq(&self, other: &Self) -> bool {
        self.pool_key() == other.pool_key()
    }
}

impl<P> std::fmt::Debug for UpgradeFactory<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeFactory")
            .field("business_host", &self.business_host)
            .field("exception_occurred", &self.exception_occurred())
            .finish()
    }
}
