//! Connection pool compatibility key
//!
//! Two upgrade configurations may share a pooled connection when their keys
//! compare equal. An empty host is never poolable, so it never compares
//! equal, not even to itself. `PoolKey` implements `PartialEq` only; use
//! [`PoolKey::group_key`] for hash-keyed pools.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Business host identity used for connection reuse
#[derive(Debug, Clone)]
pub struct PoolKey {
    host: String,
}

impl PoolKey {
    pub fn new(host: impl Into<String>) -> Self {
        PoolKey { host: host.into() }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether connections under this key may be reused at all
    pub fn is_poolable(&self) -> bool {
        !self.host.is_empty()
    }

    /// Hash of the host for pools keyed by integers, `None` if not poolable
    pub fn group_key(&self) -> Option<u64> {
        if !self.is_poolable() {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        self.host.hash(&mut hasher);
        Some(hasher.finish())
    }
}

impl PartialEq for PoolKey {
    fn eq(&self, other: &Self) -> bool {
        self.is_poolable() && other.is_poolable() && self.host == other.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_host_is_equal() {
        assert_eq!(PoolKey::new("api.example.com"), PoolKey::new("api.example.com"));
        assert_ne!(PoolKey::new("api.example.com"), PoolKey::new("cdn.example.com"));
    }

    #[test]
    fn test_comparison_is_textual() {
        assert_ne!(PoolKey::new("api.example.com"), PoolKey::new("API.example.com"));
        assert_ne!(PoolKey::new("api.example.com"), PoolKey::new("api.example.com."));
    }

    #[test]
    #[allow(clippy::eq_op)]
    fn test_empty_host_never_matches() {
        let empty = PoolKey::new("");
        assert!(!empty.is_poolable());
        assert!(empty != empty);
        assert_ne!(empty, PoolKey::new(""));
        assert_ne!(empty, PoolKey::new("api.example.com"));
        assert_ne!(PoolKey::new("api.example.com"), empty);
    }

    #[test]
    fn test_group_key() {
        let a = PoolKey::new("api.example.com").group_key();
        let b = PoolKey::new("api.example.com").group_key();
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_ne!(a, PoolKey::new("cdn.example.com").group_key());
        assert_eq!(PoolKey::new("").group_key(), None);
    }
}
