//! Expiring cache of authenticated connections.
//!
//! Entries are keyed by a SHA-256 digest of the project URL concatenated with
//! the raw token, so rotating a token yields a new key (and a new connection).
//! The token itself never appears in a key.
//!
//! Each key owns an async `RwLock` slot. Lookups of a live entry share the
//! read lock; a miss upgrades to the write lock and re-checks before
//! connecting, so concurrent misses on one key authenticate exactly once.
//!
//! Storing a new connection sweeps out every other slot that is expired (or
//! empty) and not held by an in-flight caller, releasing retired handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cancellation::guard;
use crate::{Clock, ConnectionHandle, DevOpsConnector, ProjectUrl, Secret, Timestamp, WorkflowError};

/// How long a connection is reused before re-authenticating.
pub const DEFAULT_CONNECTION_TTL: Duration = Duration::from_secs(60 * 60);

const KEY_PREFIX: &str = "connections:";

/// Derives the cache key for a project URL and token.
///
/// `connections:` followed by the lowercase hex SHA-256 of the UTF-8 bytes of
/// `project_url` immediately followed by `token`.
pub fn connection_cache_key(project_url: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_url.as_bytes());
    hasher.update(token.as_bytes());
    format!("{KEY_PREFIX}{}", hex::encode(hasher.finalize()))
}

struct CachedConnection {
    handle: ConnectionHandle,
    expires_at: Timestamp,
}

type Slot = Arc<RwLock<Option<CachedConnection>>>;

pub struct ConnectionCache {
    connector: Arc<dyn DevOpsConnector>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ConnectionCache {
    pub fn new(connector: Arc<dyn DevOpsConnector>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            connector,
            clock,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a live cached handle for `(project_url, token)`, connecting and
    /// caching a new one on miss or expiry.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::Connection`] if authentication fails. Nothing is
    ///   cached and a previous (expired) entry is left in place to be retried.
    /// - [`WorkflowError::Cancelled`] if `cancel` fires while connecting.
    pub async fn get_or_create(
        &self,
        project_url: &ProjectUrl,
        token: &Secret,
        cancel: &CancellationToken,
    ) -> Result<ConnectionHandle, WorkflowError> {
        let key = connection_cache_key(project_url.as_str(), token.expose());
        let slot = self.slot(&key);

        let cached = self.live(&*slot.read().await);
        if let Some(handle) = cached {
            debug!(cache_key = %key, "Connection cache hit");
            return Ok(handle);
        }

        let mut entry = slot.write().await;
        if let Some(handle) = self.live(&entry) {
            debug!(cache_key = %key, "Connection created by concurrent caller");
            return Ok(handle);
        }

        let organization = project_url.organization_url().to_string();
        info!(cache_key = %key, organization = %organization, "Creating connection");
        let handle = guard(cancel, "connect", self.connector.connect(project_url, token))
            .await?
            .map_err(|source| WorkflowError::Connection {
                organization,
                source,
            })?;

        *entry = Some(CachedConnection {
            handle: Arc::clone(&handle),
            expires_at: self.clock.now().plus(self.ttl),
        });
        drop(entry);
        self.evict_expired();
        Ok(handle)
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Drops idle slots whose entry is missing or past its expiry. A slot is
    /// idle when the map holds the only reference and no guard is taken.
    fn evict_expired(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_read() {
                Ok(entry) => self.live(&entry).is_some(),
                Err(_) => true,
            }
        });
        let evicted = before - slots.len();
        if evicted > 0 {
            debug!(evicted, remaining = slots.len(), "Evicted expired connections");
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn live(&self, entry: &Option<CachedConnection>) -> Option<ConnectionHandle> {
        entry
            .as_ref()
            .filter(|cached| self.clock.now() < cached.expires_at)
            .map(|cached| Arc::clone(&cached.handle))
    }
}

#[cfg(test)]
#[path = "connection_cache_tests.rs"]
mod tests;
