//! Builder for the call orchestrator
//!
//! The builder collects the configuration and the three collaborators the
//! orchestrator drives (call surface, telephony transport, audio router),
//! plus an optional persistence backend for the push keep-alive.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ahoy_client_core::{ClientBuilder, ClientConfig};
//! # use ahoy_client_core::{audio::AudioRouter, surface::CallSurface, transport::TelephonyTransport};
//!
//! # async fn run(
//! #     surface: Arc<dyn CallSurface>,
//! #     transport: Arc<dyn TelephonyTransport>,
//! #     audio: Arc<dyn AudioRouter>,
//! # ) -> ahoy_client_core::ClientResult<()> {
//! let client = ClientBuilder::new()
//!     .config(ClientConfig::new().with_access_token("eyJhbGciOi..."))
//!     .surface(surface)
//!     .transport(transport)
//!     .audio(audio)
//!     .build()
//!     .await?;
//!
//! let call_id = client.place_call("(555) 123-4567").await?;
//! # let _ = call_id;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use crate::{
    audio::AudioRouter,
    client::{manager::OrchestratorHandle, ClientConfig, Orchestrator},
    error::{ClientError, ClientResult},
    registration::{KeyValueStore, MemoryStore, RegistrationKeepAlive},
    surface::CallSurface,
    transport::TelephonyTransport,
};

/// Fluent builder for [`OrchestratorHandle`]
///
/// `surface`, `transport` and `audio` are required. Without a `store` the
/// keep-alive state lives in memory only.
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    surface: Option<Arc<dyn CallSurface>>,
    transport: Option<Arc<dyn TelephonyTransport>>,
    audio: Option<Arc<dyn AudioRouter>>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Credential handed to the transport on every dial
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = token.into();
        self
    }

    pub fn surface(mut self, surface: Arc<dyn CallSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn TelephonyTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn audio(mut self, audio: Arc<dyn AudioRouter>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Persistence for the push registration keep-alive
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate, configure the surface and start the orchestrator task
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> ClientResult<OrchestratorHandle> {
        self.config.validate()?;

        let surface = self
            .surface
            .ok_or_else(|| ClientError::config("a call surface is required"))?;
        let transport = self
            .transport
            .ok_or_else(|| ClientError::config("a telephony transport is required"))?;
        let audio = self
            .audio
            .ok_or_else(|| ClientError::config("an audio router is required"))?;
        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };

        surface.configure(&self.config.provider).await?;

        let keep_alive = RegistrationKeepAlive::new(store, self.config.registration_ttl_days);
        let (event_tx, _) = broadcast::channel(self.config.event_channel_capacity);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        info!(
            "Starting call orchestrator (max {} call group(s), registration TTL {} days)",
            self.config.provider.max_call_groups, self.config.registration_ttl_days
        );

        let orchestrator = Orchestrator::new(
            self.config,
            surface,
            transport,
            audio.clone(),
            keep_alive.clone(),
            event_tx.clone(),
            command_tx.downgrade(),
        );
        tokio::spawn(orchestrator.run(command_rx));

        Ok(OrchestratorHandle::new(command_tx, event_tx, audio, keep_alive))
    }
}
