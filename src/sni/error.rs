//! Upgrade errors
//!
//! Every way an upgrade can fail ends up as one [`UpgradeError`], so callers
//! can apply a single fallback policy while the variant keeps the cause.

use crate::tls::TlsError;
use std::io;

/// Failure category of an [`UpgradeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpgradeErrorKind {
    Config,
    SniUnsupported,
    Handshake,
}

/// Error returned by [`UpgradeFactory::upgrade`](super::UpgradeFactory::upgrade)
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// The business host is empty; nothing was attempted
    #[error("empty business host")]
    Config,

    /// No mechanism to advertise SNI for the business host
    #[error("SNI hostname setting for {host} failed")]
    SniUnsupported {
        host: String,
        #[source]
        source: Option<TlsError>,
    },

    /// Socket creation, negotiation or handshake failed
    #[error("TLS upgrade for {host} failed: {source}")]
    Handshake {
        host: String,
        #[source]
        source: TlsError,
    },
}

impl UpgradeError {
    pub fn kind(&self) -> UpgradeErrorKind {
        match self {
            UpgradeError::Config => UpgradeErrorKind::Config,
            UpgradeError::SniUnsupported { .. } => UpgradeErrorKind::SniUnsupported,
            UpgradeError::Handshake { .. } => UpgradeErrorKind::Handshake,
        }
    }

    /// Underlying provider error, if any
    pub fn cause(&self) -> Option<&TlsError> {
        match self {
            UpgradeError::Config => None,
            UpgradeError::SniUnsupported { source, .. } => source.as_ref(),
            UpgradeError::Handshake { source, .. } => Some(source),
        }
    }

    pub(crate) fn handshake(host: &str, source: TlsError) -> Self {
        UpgradeError::Handshake {
            host: host.to_string(),
            source,
        }
    }
}

impl From<UpgradeError> for io::Error {
    fn from(e: UpgradeError) -> Self {
        let kind = match e {
            UpgradeError::Config => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kinds() {
        assert_eq!(UpgradeError::Config.kind(), UpgradeErrorKind::Config);

        let e = UpgradeError::SniUnsupported {
            host: "api.example.com".to_string(),
            source: None,
        };
        assert_eq!(e.kind(), UpgradeErrorKind::SniUnsupported);
        assert!(e.cause().is_none());
    }

    #[test]
    fn test_handshake_keeps_cause() {
        let e = UpgradeError::handshake(
            "api.example.com",
            TlsError::HandshakeFailed("alert".to_string()),
        );

        assert_eq!(e.kind(), UpgradeErrorKind::Handshake);
        assert!(matches!(e.cause(), Some(TlsError::HandshakeFailed(_))));
        assert!(e.source().is_some());
        assert!(e.to_string().contains("api.example.com"));
    }

    #[test]
    fn test_into_io_error() {
        let io_err: io::Error = UpgradeError::Config.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);

        let io_err: io::Error =
            UpgradeError::handshake("api.example.com", TlsError::Unsupported("x".into())).into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
        assert!(io_err
            .get_ref()
            .and_then(|e| e.downcast_ref::<UpgradeError>())
            .is_some());
    }
}
