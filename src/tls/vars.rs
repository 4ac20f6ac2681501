//! TLS session diagnostics
//!
//! Values captured from a connection right after its handshake, for logging
//! and for callers that want to report what was negotiated.

use super::cert::{get_cert_chain, CertInfo};
use openssl::ssl::SslRef;

/// TLS variables available after handshake
#[derive(Debug, Clone)]
pub struct TlsVars {
    /// Negotiated TLS version (e.g., "TLSv1.3")
    pub version: String,

    /// Negotiated cipher suite
    pub cipher: String,

    /// SNI servername advertised by the client
    pub servername: Option<String>,

    /// Negotiated ALPN protocol
    pub alpn: Option<String>,

    /// Whether a read or write failed after the handshake
    pub failed: bool,

    /// Certificate chain (index 0 is peer cert)
    pub cert_chain: Vec<CertInfo>,

    /// Whether session was resumed
    pub sess_reused: bool,
}

impl TlsVars {
    /// Capture variables from a connection after its handshake
    pub fn from_ssl(ssl: &SslRef) -> Self {
        TlsVars {
            version: ssl.version_str().to_string(),
            cipher: ssl
                .current_cipher()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "<undef>".to_string()),
            servername: ssl
                .servername(openssl::ssl::NameType::HOST_NAME)
                .map(|s| s.to_string()),
            alpn: ssl
                .selected_alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).to_string()),
            failed: false,
            cert_chain: get_cert_chain(ssl),
            sess_reused: ssl.session_reused(),
        }
    }

    /// Get certificate info by index (0 = peer cert, 1+ = chain)
    pub fn cert(&self, index: usize) -> Option<&CertInfo> {
        self.cert_chain.get(index)
    }
}
