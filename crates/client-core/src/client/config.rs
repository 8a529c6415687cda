//! Client configuration
//!
//! [`ClientConfig`] collects everything the orchestrator needs that is not a
//! collaborator: the transport credential, the surface's provider settings,
//! push keep-alive timing and channel sizing.
//!
//! # Usage Examples
//!
//! ```rust
//! use ahoy_client_core::client::config::ClientConfig;
//!
//! let config = ClientConfig::new()
//!     .with_access_token("eyJhbGciOi...")
//!     .with_max_call_groups(1)
//!     .with_registration_ttl_days(30);
//!
//! assert_eq!(config.provider.max_call_groups, 1);
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Loading From JSON
//!
//! ```rust
//! use ahoy_client_core::client::config::ClientConfig;
//!
//! let config = ClientConfig::from_json_str(r#"{ "access_token": "abc" }"#).unwrap();
//! assert_eq!(config.access_token, "abc");
//! assert_eq!(config.registration_ttl_days, 365); // default
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    error::{ClientError, ClientResult},
    registration::{DEFAULT_REGISTRATION_TTL_DAYS, MAX_REGISTRATION_TTL_DAYS},
    surface::ProviderConfig,
};

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Credential presented to the telephony transport on connect
    pub access_token: String,

    /// Settings handed to the call-management surface at startup
    pub provider: ProviderConfig,

    /// Lifetime of a push binding in days; renewal is due at half of it
    pub registration_ttl_days: u32,

    /// Character appended to DTMF digits before they reach the transport
    ///
    /// `w` is a half-second pause for most voice transports.
    pub dtmf_pause_suffix: Option<char>,

    /// Capacity of the presentation event broadcast channel
    pub event_channel_capacity: usize,
}

impl ClientConfig {
    /// Configuration with defaults and an empty access token
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> ClientResult<Self> {
        serde_json::from_str(json).map_err(|e| ClientError::config(format!("invalid JSON configuration: {}", e)))
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_max_call_groups(mut self, groups: usize) -> Self {
        self.provider.max_call_groups = groups;
        self
    }

    pub fn with_registration_ttl_days(mut self, days: u32) -> Self {
        self.registration_ttl_days = days;
        self
    }

    pub fn with_dtmf_pause_suffix(mut self, suffix: Option<char>) -> Self {
        self.dtmf_pause_suffix = suffix;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> ClientResult<()> {
        if self.provider.max_call_groups == 0 {
            return Err(ClientError::config("max_call_groups must be at least 1"));
        }
        if self.provider.max_calls_per_group == 0 {
            return Err(ClientError::config("max_calls_per_group must be at least 1"));
        }
        if self.provider.supported_handle_kinds.is_empty() {
            return Err(ClientError::config("at least one handle kind must be supported"));
        }
        if self.registration_ttl_days == 0 {
            return Err(ClientError::config("registration_ttl_days must be at least 1"));
        }
        if self.registration_ttl_days > MAX_REGISTRATION_TTL_DAYS {
            return Err(ClientError::config(format!(
                "registration_ttl_days must be at most {}",
                MAX_REGISTRATION_TTL_DAYS
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(ClientError::config("event_channel_capacity must be at least 1"));
        }
        Ok(())
    }

    /// Apply the DTMF pause suffix to `digits`
    pub fn dtmf_string(&self, digits: &str) -> String {
        match self.dtmf_pause_suffix {
            Some(suffix) => format!("{}{}", digits, suffix),
            None => digits.to_string(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            provider: ProviderConfig::default(),
            registration_ttl_days: DEFAULT_REGISTRATION_TTL_DAYS,
            dtmf_pause_suffix: Some('w'),
            event_channel_capacity: 256,
        }
    }
}
