//! Platform TLS provider
//!
//! [`TlsProvider`] and [`ProviderSocket`] describe what the upgrade factory
//! needs from the TLS stack underneath it. [`OpenSslProvider`] implements
//! them on top of OpenSSL.

use super::cache::{SessionCache, SessionKey};
use super::capability::TlsCapability;
use super::config::{ProviderSettings, TlsError, TlsVersion};
use super::session::TlsSession;
use super::transport::{Carrier, Transport};
use openssl::ssl::{HandshakeError, Ssl, SslContext};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::sync::Arc;

/// OpenSSL 1.1.1: first release negotiating TLS 1.3
const OPENSSL_TLS13: i64 = 0x1010_1000;

/// A TLS stack able to create client sockets
pub trait TlsProvider<T> {
    /// Socket configured but not yet handshaken
    type Socket: ProviderSocket;

    /// Capability level of this provider
    fn capability(&self) -> TlsCapability;

    /// Open a new connection to `ip:port` and wrap it for TLS
    fn new_socket(&self, ip: IpAddr, port: u16) -> Result<Self::Socket, TlsError>;

    /// Wrap an already connected transport for TLS
    ///
    /// `host` and `port` identify the session for resumption. With
    /// `auto_close` unset the transport is never closed by the TLS socket.
    fn upgrade_in_place(
        &self,
        transport: T,
        host: &str,
        port: u16,
        auto_close: bool,
    ) -> Result<Self::Socket, TlsError>;
}

/// A TLS client socket before its handshake
pub trait ProviderSocket {
    /// Stream produced by a successful handshake
    type Stream;

    /// Protocol versions the provider can negotiate on this socket
    fn supported_protocols(&self) -> Vec<TlsVersion>;

    /// Restrict negotiation to `protocols`
    fn set_enabled_protocols(&mut self, protocols: &[TlsVersion]) -> Result<(), TlsError>;

    /// Enable or disable session ticket resumption
    fn set_session_tickets(&mut self, enabled: bool) -> Result<(), TlsError>;

    /// Set the SNI hostname through the provider's supported API
    fn set_sni_hostname(&mut self, host: &str) -> Result<(), TlsError>;

    /// Set the SNI hostname on a best-effort basis
    fn probe_sni_hostname(&mut self, host: &str) -> Result<(), TlsError> {
        let _ = host;
        Err(TlsError::Unsupported("SNI probe".to_string()))
    }

    /// Perform the handshake, blocking until it completes
    fn handshake(self) -> Result<Self::Stream, TlsError>;
}

struct Contexts {
    with_tickets: SslContext,
    without_tickets: SslContext,
}

/// OpenSSL-backed [`TlsProvider`]
///
/// Cloning is cheap; clones share contexts and the session cache.
#[derive(Clone)]
pub struct OpenSslProvider {
    contexts: Arc<Contexts>,
    cache: Option<SessionCache>,
    settings: ProviderSettings,
}

impl OpenSslProvider {
    pub(crate) fn new(
        with_tickets: SslContext,
        without_tickets: SslContext,
        cache: Option<SessionCache>,
        settings: ProviderSettings,
    ) -> Self {
        OpenSslProvider {
            contexts: Arc::new(Contexts {
                with_tickets,
                without_tickets,
            }),
            cache,
            settings,
        }
    }

    /// Session cache shared by connections of this provider
    pub fn session_cache(&self) -> Option<&SessionCache> {
        self.cache.as_ref()
    }

    pub(crate) fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Versions this build of OpenSSL negotiates, within the configured range
    pub fn supported_versions(&self) -> Vec<TlsVersion> {
        let library_max = if openssl::version::number() >= OPENSSL_TLS13 {
            TlsVersion::Tls13
        } else {
            TlsVersion::Tls12
        };
        let min = self.settings.min_version.unwrap_or(TlsVersion::Tls10);
        let max = self.settings.max_version.unwrap_or(library_max).min(library_max);

        TlsVersion::ALL
            .iter()
            .copied()
            .filter(|v| *v >= min && *v <= max)
            .collect()
    }

    fn pending<T>(&self, carrier: Carrier<T>, host: Option<&str>, port: u16) -> PendingTls<T> {
        PendingTls {
            provider: self.clone(),
            carrier,
            session_host: host.map(str::to_string),
            port,
            sni: None,
            session_tickets: true,
            protocols: None,
        }
    }

    fn connect_direct(&self, addr: SocketAddr) -> Result<TcpStream, TlsError> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nodelay(true)?;
        match self.settings.handshake_timeout {
            Some(timeout) => socket.connect_timeout(&addr.into(), timeout)?,
            None => socket.connect(&addr.into())?,
        }
        Ok(socket.into())
    }
}

impl std::fmt::Debug for OpenSslProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSslProvider")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .finish()
    }
}

impl<T: Transport> TlsProvider<T> for OpenSslProvider {
    type Socket = PendingTls<T>;

    fn capability(&self) -> TlsCapability {
        self.settings.capability.unwrap_or_else(TlsCapability::current)
    }

    fn new_socket(&self, ip: IpAddr, port: u16) -> Result<PendingTls<T>, TlsError> {
        let stream = self.connect_direct(SocketAddr::new(ip, port))?;
        Ok(self.pending(Carrier::Direct(stream), None, port))
    }

    fn upgrade_in_place(
        &self,
        transport: T,
        host: &str,
        port: u16,
        auto_close: bool,
    ) -> Result<PendingTls<T>, TlsError> {
        let carrier = Carrier::Upgraded {
            transport,
            auto_close,
        };
        Ok(self.pending(carrier, Some(host), port))
    }
}

/// OpenSSL client socket awaiting its handshake
///
/// Settings are recorded and applied to a fresh `Ssl` when the handshake
/// starts, so the ticket mode can still pick the context.
pub struct PendingTls<T> {
    provider: OpenSslProvider,
    carrier: Carrier<T>,
    session_host: Option<String>,
    port: u16,
    sni: Option<String>,
    session_tickets: bool,
    protocols: Option<(TlsVersion, TlsVersion)>,
}

impl<T: Transport> PendingTls<T> {
    /// Stream the handshake will run over
    pub fn carrier(&self) -> &Carrier<T> {
        &self.carrier
    }

    /// SNI hostname to be advertised
    pub fn sni_hostname(&self) -> Option<&str> {
        self.sni.as_deref()
    }

    fn ssl(&self) -> Result<(Ssl, bool), TlsError> {
        let contexts = &self.provider.contexts;
        let ctx = if self.session_tickets {
            &contexts.with_tickets
        } else {
            &contexts.without_tickets
        };
        let mut ssl = Ssl::new(ctx)?;

        if let Some((min, max)) = self.protocols {
            ssl.set_min_proto_version(Some(min.to_openssl_version()))?;
            ssl.set_max_proto_version(Some(max.to_openssl_version()))?;
        }

        if let Some(ref sni) = self.sni {
            ssl.set_hostname(sni)?;
            if self.provider.settings.verify_peer {
                ssl.param_mut().set_host(sni)?;
            }
        }

        let mut resumed = false;
        let host = self.sni.as_ref().or(self.session_host.as_ref());
        if let (Some(cache), Some(host)) = (self.provider.cache.as_ref(), host) {
            let key = SessionKey {
                host: host.clone(),
                port: self.port,
                tickets: self.session_tickets,
            };
            resumed = cache.prepare(&mut ssl, key)?;
        }

        Ok((ssl, resumed))
    }
}

impl<T: Transport> ProviderSocket for PendingTls<T> {
    type Stream = TlsSession<Carrier<T>>;

    fn supported_protocols(&self) -> Vec<TlsVersion> {
        self.provider.supported_versions()
    }

    fn set_enabled_protocols(&mut self, protocols: &[TlsVersion]) -> Result<(), TlsError> {
        let min = protocols.iter().min().copied();
        let max = protocols.iter().max().copied();
        match (min, max) {
            (Some(min), Some(max)) => {
                self.protocols = Some((min, max));
                Ok(())
            }
            _ => Err(TlsError::InvalidConfig(
                "no protocol versions enabled".to_string(),
            )),
        }
    }

    fn set_session_tickets(&mut self, enabled: bool) -> Result<(), TlsError> {
        self.session_tickets = enabled;
        Ok(())
    }

    fn set_sni_hostname(&mut self, host: &str) -> Result<(), TlsError> {
        if host.is_empty() {
            return Err(TlsError::InvalidConfig("empty SNI hostname".to_string()));
        }
        self.sni = Some(host.to_string());
        Ok(())
    }

    /// Checks the servername against a scratch connection before recording it.
    fn probe_sni_hostname(&mut self, host: &str) -> Result<(), TlsError> {
        let mut ssl = Ssl::new(&self.provider.contexts.with_tickets)?;
        ssl.set_hostname(host)
            .map_err(|e| TlsError::Unsupported(format!("servername {}: {}", host, e)))?;
        self.sni = Some(host.to_string());
        Ok(())
    }

    fn handshake(self) -> Result<TlsSession<Carrier<T>>, TlsError> {
        let (ssl, resumed) = self.ssl()?;
        if resumed {
            log::debug!("offering cached session for port {}", self.port);
        }

        let timeout = self.provider.settings.handshake_timeout;
        let previous = self.carrier.io_timeout()?;
        self.carrier.set_io_timeout(timeout)?;

        let stream = match ssl.connect(self.carrier) {
            Ok(stream) => stream,
            Err(e) => return Err(handshake_error(e)),
        };
        stream.get_ref().set_io_timeout(previous)?;

        Ok(TlsSession::new(stream))
    }
}

fn handshake_error<S>(e: HandshakeError<S>) -> TlsError {
    match e {
        HandshakeError::SetupFailure(stack) => TlsError::OpenSsl(stack),
        HandshakeError::Failure(mid) => {
            let verify = mid.ssl().verify_result();
            if verify.as_raw() != 0 {
                TlsError::Certificate(format!("{}: {}", mid.error(), verify.error_string()))
            } else {
                TlsError::HandshakeFailed(mid.error().to_string())
            }
        }
        HandshakeError::WouldBlock(mid) => {
            TlsError::HandshakeFailed(format!("handshake timed out: {}", mid.error()))
        }
    }
}
