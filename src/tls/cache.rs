//! Client-side TLS session cache
//!
//! Sessions handed out by OpenSSL after a handshake are kept per
//! (host, port, ticket mode) and offered again on the next connection to the
//! same endpoint.

use super::config::TlsError;
use openssl::ex_data::Index;
use openssl::ssl::{Ssl, SslContextBuilder, SslRef, SslSession};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Key a cached session is stored under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub host: String,
    pub port: u16,
    /// Sessions are only valid for the context that created them, and the
    /// provider keeps one context per ticket mode.
    pub tickets: bool,
}

#[derive(Default)]
struct Entries {
    sessions: HashMap<SessionKey, SslSession>,
    order: VecDeque<SessionKey>,
}

/// Bounded session cache shared by all connections of one provider
#[derive(Clone)]
pub struct SessionCache {
    capacity: usize,
    entries: Arc<Mutex<Entries>>,
    index: Arc<Mutex<Option<Index<Ssl, SessionKey>>>>,
}

impl SessionCache {
    /// Create an empty cache holding at most `capacity` sessions
    pub fn new(capacity: usize) -> Self {
        SessionCache {
            capacity,
            entries: Arc::new(Mutex::new(Entries::default())),
            index: Arc::new(Mutex::new(None)),
        }
    }

    /// Hook the cache into a context's new-session callback
    pub(crate) fn install(&self, ctx_builder: &mut SslContextBuilder) -> Result<(), TlsError> {
        let index = self.index()?;
        let cache = self.clone();
        ctx_builder.set_new_session_callback(move |ssl, session| {
            if let Some(key) = ssl.ex_data(index) {
                log::debug!("caching TLS session for {}:{}", key.host, key.port);
                cache.insert(key.clone(), session);
            }
        });
        Ok(())
    }

    /// Tag a connection so its session is stored under `key`, and offer a
    /// previously cached session for the same key.
    pub(crate) fn prepare(&self, ssl: &mut SslRef, key: SessionKey) -> Result<bool, TlsError> {
        let index = self.index()?;
        let mut resumed = false;
        if let Some(session) = self.get(&key) {
            // SAFETY: sessions are cached per ticket mode, which selects the
            // context `ssl` was created from, so `session` belongs to it.
            unsafe { ssl.set_session(&session)? };
            resumed = true;
        }
        ssl.set_ex_data(index, key);
        Ok(resumed)
    }

    /// Look up a cached session
    pub fn get(&self, key: &SessionKey) -> Option<SslSession> {
        self.entries.lock().sessions.get(key).cloned()
    }

    /// Store a session, evicting the least recently stored entry when full
    pub fn insert(&self, key: SessionKey, session: SslSession) {
        let mut entries = self.entries.lock();
        if entries.sessions.insert(key.clone(), session).is_some() {
            // Refreshed entries become the newest
            entries.order.retain(|k| *k != key);
        }
        entries.order.push_back(key);
        while entries.sessions.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.sessions.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Number of cached sessions
    pub fn len(&self) -> usize {
        self.entries.lock().sessions.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached sessions
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn index(&self) -> Result<Index<Ssl, SessionKey>, TlsError> {
        let mut index = self.index.lock();
        match *index {
            Some(index) => Ok(index),
            None => {
                let created = Ssl::new_ex_index::<SessionKey>()?;
                *index = Some(created);
                Ok(created)
            }
        }
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
