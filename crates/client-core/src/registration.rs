//! Push registration keep-alive
//!
//! A device/identity binding with the push service lives for a fixed TTL
//! (365 days by default). The TTL is reset whenever the device registers or a
//! push notification is delivered to it. This module decides when the push
//! adapter has to register again, based on two persisted values:
//!
//! - `CachedDeviceToken` - the device token last registered successfully
//! - `CachedBindingDate` - when the binding was last created or refreshed
//!
//! Registration is due once half of the TTL has elapsed since the binding
//! date, when no binding date is stored, or when the device token changed.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use ahoy_client_core::registration::{MemoryStore, RegistrationKeepAlive};
//!
//! let keep_alive = RegistrationKeepAlive::new(Arc::new(MemoryStore::new()), 365);
//! let now = Utc::now();
//!
//! // Nothing stored yet
//! assert!(keep_alive.registration_required_at(now));
//!
//! keep_alive.record_registration(b"device-token", now).unwrap();
//! assert!(!keep_alive.registration_required_at(now + Duration::days(100)));
//! assert!(keep_alive.registration_required_at(now + Duration::days(183)));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::{
    call::{CallInvite, CancelledCallInvite},
    error::{ClientError, ClientResult},
    transport::PushPayload,
};

/// Key holding the last successfully registered device token
pub const CACHED_DEVICE_TOKEN_KEY: &str = "CachedDeviceToken";

/// Key holding the last binding timestamp
pub const CACHED_BINDING_DATE_KEY: &str = "CachedBindingDate";

/// Default binding TTL in days
pub const DEFAULT_REGISTRATION_TTL_DAYS: u32 = 365;

/// Longest binding TTL a configuration may ask for
pub const MAX_REGISTRATION_TTL_DAYS: u32 = 36_500;

/// Small persistence interface for keep-alive state
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: String) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

/// In-process [`KeyValueStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ClientError::persistence("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> ClientResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ClientError::persistence("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ClientError::persistence("memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Decides when push registration must be renewed
#[derive(Clone)]
pub struct RegistrationKeepAlive {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl std::fmt::Debug for RegistrationKeepAlive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationKeepAlive")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl RegistrationKeepAlive {
    /// Keep-alive over `store` for a binding valid `ttl_days` days
    pub fn new(store: Arc<dyn KeyValueStore>, ttl_days: u32) -> Self {
        Self {
            store,
            ttl: Duration::days(i64::from(ttl_days)),
        }
    }

    /// Time after which a binding should be renewed (half the TTL)
    pub fn renewal_interval(&self) -> Duration {
        self.ttl / 2
    }

    /// When the binding was last created or refreshed
    ///
    /// An unreadable or unparsable value counts as absent.
    pub fn last_binding_date(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.get(CACHED_BINDING_DATE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read binding date: {}", e);
                return None;
            }
        };

        match DateTime::parse_from_rfc3339(&raw) {
            Ok(date) => Some(date.with_timezone(&Utc)),
            Err(e) => {
                warn!("Ignoring unparsable binding date {:?}: {}", raw, e);
                None
            }
        }
    }

    /// Whether registration is due at `now`
    ///
    /// A renewal time past the end of the calendar is never reached.
    pub fn registration_required_at(&self, now: DateTime<Utc>) -> bool {
        let Some(bound_at) = self.last_binding_date() else {
            return true;
        };
        match bound_at.checked_add_signed(self.renewal_interval()) {
            Some(due) => now >= due,
            None => {
                warn!("Renewal time for binding at {} is out of range", bound_at);
                false
            }
        }
    }

    /// Whether registration is due now
    pub fn registration_required(&self) -> bool {
        self.registration_required_at(Utc::now())
    }

    /// Device token from the last successful registration
    pub fn cached_device_token(&self) -> ClientResult<Option<Vec<u8>>> {
        match self.store.get(CACHED_DEVICE_TOKEN_KEY)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(|e| ClientError::persistence(format!("corrupt device token: {}", e))),
            None => Ok(None),
        }
    }

    /// Whether `device_token` has to be (re-)registered at `now`
    pub fn needs_registration_at(&self, device_token: &[u8], now: DateTime<Utc>) -> bool {
        if self.registration_required_at(now) {
            return true;
        }
        match self.cached_device_token() {
            Ok(Some(cached)) => cached != device_token,
            Ok(None) => true,
            Err(e) => {
                warn!("Treating unreadable device token as stale: {}", e);
                true
            }
        }
    }

    /// Whether `device_token` has to be (re-)registered now
    pub fn needs_registration(&self, device_token: &[u8]) -> bool {
        self.needs_registration_at(device_token, Utc::now())
    }

    /// Persist a successful registration of `device_token` at `at`
    pub fn record_registration(&self, device_token: &[u8], at: DateTime<Utc>) -> ClientResult<()> {
        self.store
            .set(CACHED_DEVICE_TOKEN_KEY, STANDARD.encode(device_token))?;
        self.refresh_binding(at)
    }

    /// Reset the binding clock, e.g. when a push notification arrives
    pub fn refresh_binding(&self, at: DateTime<Utc>) -> ClientResult<()> {
        debug!("Refreshing push binding date to {}", at);
        self.store.set(CACHED_BINDING_DATE_KEY, at.to_rfc3339())
    }

    /// Forget the binding after the push credentials were invalidated
    ///
    /// Returns the token that was cached so the caller can unregister it.
    pub fn invalidate(&self) -> ClientResult<Option<Vec<u8>>> {
        let token = self.cached_device_token().unwrap_or_else(|e| {
            warn!("Dropping unreadable device token: {}", e);
            None
        });
        self.store.remove(CACHED_DEVICE_TOKEN_KEY)?;
        self.store.remove(CACHED_BINDING_DATE_KEY)?;
        Ok(token)
    }
}

/// Push transport → orchestrator
#[async_trait]
pub trait PushEventSink: Send + Sync {
    /// Hand an opaque push payload to the orchestrator
    ///
    /// The payload is decoded by the telephony transport and dispatched as an
    /// invite or a cancellation. Resolves once the orchestrator has reported
    /// any incoming call to the surface.
    async fn push_received(&self, payload: PushPayload) -> ClientResult<()>;

    /// A decoded inbound call
    async fn invite_received(&self, invite: CallInvite) -> ClientResult<()>;

    /// A decoded cancellation
    async fn invite_cancelled(&self, cancelled: CancelledCallInvite, reason: String) -> ClientResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep_alive() -> (Arc<MemoryStore>, RegistrationKeepAlive) {
        let store = Arc::new(MemoryStore::new());
        let keep_alive = RegistrationKeepAlive::new(store.clone(), DEFAULT_REGISTRATION_TTL_DAYS);
        (store, keep_alive)
    }

    #[test]
    fn test_renewal_interval_is_half_ttl() {
        let (_, keep_alive) = keep_alive();
        assert_eq!(keep_alive.renewal_interval(), Duration::days(182) + Duration::hours(12));
    }

    #[test]
    fn test_required_exactly_at_half_ttl() {
        let (_, keep_alive) = keep_alive();
        let bound_at = Utc::now();
        keep_alive.refresh_binding(bound_at).unwrap();

        let half = keep_alive.renewal_interval();
        assert!(!keep_alive.registration_required_at(bound_at + half - Duration::seconds(1)));
        assert!(keep_alive.registration_required_at(bound_at + half));
        assert!(keep_alive.registration_required_at(bound_at + half + Duration::days(1)));
    }

    #[test]
    fn test_unparsable_date_counts_as_absent() {
        let (store, keep_alive) = keep_alive();
        store.set(CACHED_BINDING_DATE_KEY, "yesterday".to_string()).unwrap();
        assert!(keep_alive.last_binding_date().is_none());
        assert!(keep_alive.registration_required());
    }

    #[test]
    fn test_token_change_forces_registration() {
        let (_, keep_alive) = keep_alive();
        let now = Utc::now();
        keep_alive.record_registration(b"token-a", now).unwrap();

        assert!(!keep_alive.needs_registration_at(b"token-a", now));
        assert!(keep_alive.needs_registration_at(b"token-b", now));
        assert_eq!(keep_alive.cached_device_token().unwrap(), Some(b"token-a".to_vec()));
    }

    #[test]
    fn test_out_of_range_renewal_is_not_due() {
        let keep_alive = RegistrationKeepAlive::new(Arc::new(MemoryStore::new()), u32::MAX);
        let bound_at = Utc::now();
        keep_alive.refresh_binding(bound_at).unwrap();

        assert!(!keep_alive.registration_required_at(bound_at));
        assert!(!keep_alive.registration_required());
    }

    #[test]
    fn test_invalidate_clears_both_keys() {
        let (store, keep_alive) = keep_alive();
        keep_alive.record_registration(b"token-a", Utc::now()).unwrap();

        let previous = keep_alive.invalidate().unwrap();
        assert_eq!(previous, Some(b"token-a".to_vec()));
        assert_eq!(store.get(CACHED_DEVICE_TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(CACHED_BINDING_DATE_KEY).unwrap(), None);
        assert!(keep_alive.registration_required());
    }
}
