//! TLS configuration
//!
//! This module provides the client configuration builder used to construct
//! the OpenSSL-backed provider.

use super::cache::SessionCache;
use super::capability::TlsCapability;
use super::provider::OpenSslProvider;
use openssl::ssl::{
    SslContext, SslContextBuilder, SslMethod, SslOptions, SslSessionCacheMode, SslVerifyMode,
};
use std::path::PathBuf;
use std::time::Duration;

/// Default handshake timeout
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of cached client sessions
pub const DEFAULT_SESSION_CACHE_CAPACITY: usize = 256;

/// TLS version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// All versions, oldest first
    pub const ALL: [TlsVersion; 4] = [
        TlsVersion::Tls10,
        TlsVersion::Tls11,
        TlsVersion::Tls12,
        TlsVersion::Tls13,
    ];

    /// Get OpenSSL protocol version constant
    pub fn to_openssl_version(&self) -> openssl::ssl::SslVersion {
        use openssl::ssl::SslVersion;
        match self {
            TlsVersion::Tls10 => SslVersion::TLS1,
            TlsVersion::Tls11 => SslVersion::TLS1_1,
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }

    /// Get version as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "TLSv1",
            TlsVersion::Tls11 => "TLSv1.1",
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }
}

/// TLS errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TLS version: {0}")]
    InvalidVersion(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Unsupported by TLS provider: {0}")]
    Unsupported(String),
}

/// Entry point for TLS configuration
pub struct TlsConfig;

impl TlsConfig {
    /// Create a new client configuration builder
    pub fn client() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Client configuration builder
///
/// Setters only record values. All OpenSSL calls happen in [`build`], which
/// reports invalid settings as a [`TlsError`].
///
/// [`build`]: ClientConfigBuilder::build
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    min_version: Option<TlsVersion>,
    max_version: Option<TlsVersion>,
    cipher_list: Option<String>,
    ciphersuites: Option<String>,
    alpn: Vec<String>,
    verify_peer: bool,
    ca_file: Option<PathBuf>,
    handshake_timeout: Option<Duration>,
    session_cache: Option<usize>,
    capability: Option<TlsCapability>,
}

impl ClientConfigBuilder {
    fn new() -> Self {
        ClientConfigBuilder {
            min_version: None,
            max_version: None,
            cipher_list: None,
            ciphersuites: None,
            alpn: Vec::new(),
            verify_peer: true,
            ca_file: None,
            handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT),
            session_cache: Some(DEFAULT_SESSION_CACHE_CAPACITY),
            capability: None,
        }
    }

    /// Set TLS version (both min and max)
    pub fn version(self, version: TlsVersion) -> Self {
        self.version_range(version, version)
    }

    /// Set TLS version range
    pub fn version_range(mut self, min: TlsVersion, max: TlsVersion) -> Self {
        self.min_version = Some(min);
        self.max_version = Some(max);
        self
    }

    /// Set cipher list (for TLS <= 1.2)
    pub fn cipher_list(mut self, ciphers: impl Into<String>) -> Self {
        self.cipher_list = Some(ciphers.into());
        self
    }

    /// Set cipher suites (for TLS 1.3)
    pub fn ciphersuites(mut self, ciphers: impl Into<String>) -> Self {
        self.ciphersuites = Some(ciphers.into());
        self
    }

    /// Set ALPN protocols
    pub fn alpn(mut self, protocols: &[&str]) -> Self {
        self.alpn = protocols.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Enable/disable peer certificate verification during the handshake
    pub fn verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    /// Trust the CA certificates in a PEM file in addition to the system store
    pub fn ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }

    /// Bound the handshake (and the legacy connect) by a timeout
    pub fn handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Enable the client session cache with the given capacity, or disable it
    pub fn session_cache(mut self, capacity: Option<usize>) -> Self {
        self.session_cache = capacity.filter(|c| *c > 0);
        self
    }

    /// Override the capability detected from the linked OpenSSL
    pub fn capability(mut self, capability: TlsCapability) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Build the provider
    pub fn build(self) -> Result<OpenSslProvider, TlsError> {
        if let (Some(min), Some(max)) = (self.min_version, self.max_version) {
            if min > max {
                return Err(TlsError::InvalidVersion(format!(
                    "minimum version {} is above maximum version {}",
                    min.as_str(),
                    max.as_str()
                )));
            }
        }

        let cache = self.session_cache.map(SessionCache::new);
        let ctx = self.context(true, cache.as_ref())?;
        let ctx_no_tickets = self.context(false, cache.as_ref())?;

        Ok(OpenSslProvider::new(
            ctx,
            ctx_no_tickets,
            cache,
            ProviderSettings {
                verify_peer: self.verify_peer,
                handshake_timeout: self.handshake_timeout,
                min_version: self.min_version,
                max_version: self.max_version,
                capability: self.capability,
            },
        ))
    }

    fn context(
        &self,
        session_tickets: bool,
        cache: Option<&SessionCache>,
    ) -> Result<SslContext, TlsError> {
        let mut ctx_builder = SslContextBuilder::new(SslMethod::tls_client())?;

        if self.verify_peer {
            ctx_builder.set_default_verify_paths()?;
            if let Some(ref path) = self.ca_file {
                ctx_builder.set_ca_file(path).map_err(|e| {
                    TlsError::Certificate(format!(
                        "Failed to load CA file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            }
            ctx_builder.set_verify(SslVerifyMode::PEER);
        } else {
            ctx_builder.set_verify(SslVerifyMode::NONE);
        }

        if let Some(min) = self.min_version {
            ctx_builder.set_min_proto_version(Some(min.to_openssl_version()))?;
        }
        if let Some(max) = self.max_version {
            ctx_builder.set_max_proto_version(Some(max.to_openssl_version()))?;
        }
        if let Some(ref ciphers) = self.cipher_list {
            ctx_builder.set_cipher_list(ciphers)?;
        }
        if let Some(ref ciphers) = self.ciphersuites {
            ctx_builder.set_ciphersuites(ciphers)?;
        }

        if !self.alpn.is_empty() {
            // Encode ALPN protocols (length-prefixed)
            let mut alpn_bytes = Vec::new();
            for proto in &self.alpn {
                let len = u8::try_from(proto.len()).map_err(|_| {
                    TlsError::InvalidConfig(format!("ALPN protocol too long: {}", proto))
                })?;
                alpn_bytes.push(len);
                alpn_bytes.extend_from_slice(proto.as_bytes());
            }
            ctx_builder.set_alpn_protos(&alpn_bytes)?;
        }

        if session_tickets {
            ctx_builder.clear_options(SslOptions::NO_TICKET);
        } else {
            ctx_builder.set_options(SslOptions::NO_TICKET);
        }

        match cache {
            Some(cache) => {
                ctx_builder.set_session_cache_mode(SslSessionCacheMode::CLIENT);
                cache.install(&mut ctx_builder)?;
            }
            None => {
                ctx_builder.set_session_cache_mode(SslSessionCacheMode::OFF);
            }
        }

        Ok(ctx_builder.build())
    }
}

/// Settings applied per connection by the provider
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProviderSettings {
    pub(crate) verify_peer: bool,
    pub(crate) handshake_timeout: Option<Duration>,
    pub(crate) min_version: Option<TlsVersion>,
    pub(crate) max_version: Option<TlsVersion>,
    pub(crate) capability: Option<TlsCapability>,
}
