//! Platform TLS capability
//!
//! The capability is probed once per process from the linked OpenSSL and
//! decides how the upgrade factory creates TLS sockets.

use std::sync::OnceLock;

/// OpenSSL 1.1.0: per-connection SNI and hostname checks on an existing stream
const OPENSSL_NATIVE_SNI: i64 = 0x1010_0000;
/// OpenSSL 1.0.2: documented hostname API (`X509_VERIFY_PARAM_set1_host`)
const OPENSSL_DOCUMENTED_SNI: i64 = 0x1000_2000;
/// OpenSSL 0.9.8f: first release carrying the TLS servername extension
const OPENSSL_TLSEXT: i64 = 0x0090_806f;

/// How SNI can be set on a freshly created socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniSupport {
    /// The provider exposes a supported API for the servername
    Documented,
    /// The servername can only be set on a best-effort basis
    Probed,
    /// No way to advertise SNI
    Unavailable,
}

/// Process-wide TLS capability level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsCapability {
    /// An existing transport can be upgraded in place with SNI
    Native,
    /// A new socket must be created; SNI support as given
    Legacy(SniSupport),
}

impl TlsCapability {
    /// Capability of the OpenSSL linked into this process
    pub fn current() -> TlsCapability {
        static CAPABILITY: OnceLock<TlsCapability> = OnceLock::new();
        *CAPABILITY.get_or_init(|| {
            let capability = Self::from_openssl_version(openssl::version::number());
            log::debug!(
                "TLS capability {:?} for {}",
                capability,
                openssl::version::version()
            );
            capability
        })
    }

    /// Map an `OPENSSL_VERSION_NUMBER` to a capability level
    pub fn from_openssl_version(number: i64) -> TlsCapability {
        if number >= OPENSSL_NATIVE_SNI {
            TlsCapability::Native
        } else if number >= OPENSSL_DOCUMENTED_SNI {
            TlsCapability::Legacy(SniSupport::Documented)
        } else if number >= OPENSSL_TLSEXT {
            TlsCapability::Legacy(SniSupport::Probed)
        } else {
            TlsCapability::Legacy(SniSupport::Unavailable)
        }
    }
}
