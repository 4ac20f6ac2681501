//! Certificate handling and hostname matching
//!
//! This module extracts identities from X.509 certificates and implements the
//! provider's default hostname check on top of them.

use openssl::nid::Nid;
use openssl::ssl::SslRef;
use openssl::x509::{X509NameRef, X509Ref, X509};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Anything that can hand out the peer's leaf certificate
pub trait PeerCertificate {
    fn peer_certificate(&self) -> Option<X509>;
}

impl PeerCertificate for SslRef {
    fn peer_certificate(&self) -> Option<X509> {
        SslRef::peer_certificate(self)
    }
}

/// Certificate information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// Certificate subject (Common Name)
    pub subject: String,
    /// Certificate issuer (Common Name)
    pub issuer: String,
    /// DNS names from the Subject Alternative Name extension
    pub dns_names: Vec<String>,
    /// IP addresses from the Subject Alternative Name extension
    pub ip_addresses: Vec<IpAddr>,
}

impl CertInfo {
    /// Extract certificate information from an X.509 certificate
    pub fn from_x509(cert: &X509Ref) -> Self {
        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();

        if let Some(san_ext) = cert.subject_alt_names() {
            for name in san_ext {
                if let Some(dns) = name.dnsname() {
                    dns_names.push(dns.to_string());
                } else if let Some(ip) = name.ipaddress().and_then(ip_from_bytes) {
                    ip_addresses.push(ip);
                }
            }
        }

        CertInfo {
            subject: get_cn(cert.subject_name()).unwrap_or_else(|| "<undef>".to_string()),
            issuer: get_cn(cert.issuer_name()).unwrap_or_else(|| "<undef>".to_string()),
            dns_names,
            ip_addresses,
        }
    }

    /// Whether the certificate is valid for `host`
    ///
    /// IP literals match IP SANs only. Names match DNS SANs, falling back to
    /// the Common Name when the certificate carries no DNS SAN.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return false;
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return self.ip_addresses.contains(&ip);
        }

        if self.dns_names.is_empty() {
            return self.subject != "<undef>" && name_matches(&self.subject, host);
        }
        self.dns_names.iter().any(|pattern| name_matches(pattern, host))
    }
}

/// Check the leaf certificate of `cert` against `host`
pub fn verify_hostname(cert: &X509Ref, host: &str) -> bool {
    CertInfo::from_x509(cert).matches_host(host)
}

/// Extract certificate chain information from SSL connection
pub fn get_cert_chain(ssl: &SslRef) -> Vec<CertInfo> {
    let mut chain = Vec::new();

    // Get peer certificate (index 0)
    if let Some(peer_cert) = ssl.peer_certificate() {
        chain.push(CertInfo::from_x509(&peer_cert));
    }

    // Get certificate chain (index 1+); clients receive the leaf here too
    if let Some(cert_chain) = ssl.peer_cert_chain() {
        for cert in cert_chain.iter().skip(if ssl.is_server() { 0 } else { 1 }) {
            chain.push(CertInfo::from_x509(cert));
        }
    }

    chain
}

fn get_cn(name: &X509NameRef) -> Option<String> {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| std::str::from_utf8(entry.data().as_slice()).ok())
        .map(|s| s.to_string())
}

fn ip_from_bytes(ip: &[u8]) -> Option<IpAddr> {
    match ip.len() {
        4 => Some(IpAddr::V4(Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]))),
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(ip);
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Match a certificate name pattern against a hostname
///
/// A wildcard is only honoured as the whole leftmost label of a pattern with
/// at least two further labels, and it covers exactly one label.
fn name_matches(pattern: &str, host: &str) -> bool {
    let pattern = normalize(pattern);
    let host = normalize(host);
    if pattern.is_empty() || host.is_empty() {
        return false;
    }

    let Some(suffix) = pattern.strip_prefix("*.") else {
        return !pattern.contains('*') && pattern == host;
    };

    if suffix.contains('*') || !suffix.contains('.') {
        return false;
    }

    match host.strip_suffix(suffix) {
        Some(label) => {
            let label = match label.strip_suffix('.') {
                Some(label) => label,
                None => return false,
            };
            !label.is_empty() && !label.contains('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::builtin_cert::BUILTIN_CERT;

    fn builtin() -> CertInfo {
        let cert = X509::from_pem(BUILTIN_CERT.as_bytes()).unwrap();
        CertInfo::from_x509(&cert)
    }

    #[test]
    fn test_cert_info_from_builtin() {
        let info = builtin();

        assert_eq!(info.subject, "example.com");
        assert_eq!(info.issuer, "example.com"); // Self-signed
        assert_eq!(info.dns_names, vec!["example.com", "*.example.com"]);
        assert!(info.ip_addresses.is_empty());
    }

    #[test]
    fn test_matches_business_hosts() {
        let info = builtin();

        assert!(info.matches_host("example.com"));
        assert!(info.matches_host("api.example.com"));
        assert!(info.matches_host("API.Example.COM."));
        assert!(!info.matches_host("a.b.example.com"));
        assert!(!info.matches_host("example.org"));
        assert!(!info.matches_host("notexample.com"));
        assert!(!info.matches_host(""));
    }

    #[test]
    fn test_ip_literals_need_ip_sans() {
        let mut info = builtin();
        assert!(!info.matches_host("203.0.113.5"));

        info.ip_addresses.push("203.0.113.5".parse().unwrap());
        info.ip_addresses.push("2001:db8::1".parse().unwrap());
        assert!(info.matches_host("203.0.113.5"));
        assert!(info.matches_host("[2001:db8::1]"));
        assert!(!info.matches_host("203.0.113.6"));
    }

    #[test]
    fn test_common_name_fallback() {
        let info = CertInfo {
            subject: "legacy.example.com".to_string(),
            issuer: "ca".to_string(),
            dns_names: Vec::new(),
            ip_addresses: Vec::new(),
        };
        assert!(info.matches_host("legacy.example.com"));
        assert!(!info.matches_host("api.example.com"));

        let with_san = CertInfo {
            dns_names: vec!["api.example.com".to_string()],
            ..info
        };
        assert!(!with_san.matches_host("legacy.example.com"));
    }

    #[test]
    fn test_wildcard_rules() {
        assert!(name_matches("*.example.com", "www.example.com"));
        assert!(!name_matches("*.example.com", "example.com"));
        assert!(!name_matches("*.com", "example.com"));
        assert!(!name_matches("w*.example.com", "www.example.com"));
        assert!(!name_matches("*.*.example.com", "a.b.example.com"));
        assert!(!name_matches("*.example.com", ".example.com"));
    }

    #[test]
    fn test_verify_hostname() {
        let cert = X509::from_pem(BUILTIN_CERT.as_bytes()).unwrap();
        assert!(verify_hostname(&cert, "api.example.com"));
        assert!(!verify_hostname(&cert, "127.0.0.1"));
    }
}
