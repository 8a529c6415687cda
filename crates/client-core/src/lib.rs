//! # Ahoy Client Core - Call Session Orchestration
//!
//! This crate keeps three externally owned subsystems in agreement about the
//! calls that exist:
//!
//! - **Call-management surface**: the system facility owning the call UI; every
//!   lifecycle transition is requested through it ([`surface`])
//! - **Telephony transport**: the SDK that carries the audio ([`transport`])
//! - **Push transport**: wakes the app for inbound calls ([`registration`])
//!
//! A single orchestrator task owns all session and invite state. Everything
//! else talks to it through an [`OrchestratorHandle`], which publishes
//! [`ClientEvent`] snapshots for the presentation layer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ahoy_client_core::{ClientBuilder, ClientEvent};
//! # use ahoy_client_core::{audio::AudioRouter, surface::CallSurface, transport::TelephonyTransport};
//!
//! # async fn run(
//! #     surface: Arc<dyn CallSurface>,
//! #     transport: Arc<dyn TelephonyTransport>,
//! #     audio: Arc<dyn AudioRouter>,
//! # ) -> ahoy_client_core::ClientResult<()> {
//! let client = ClientBuilder::new()
//!     .access_token("eyJhbGciOi...")
//!     .surface(surface)
//!     .transport(transport)
//!     .audio(audio)
//!     .build()
//!     .await?;
//!
//! let mut events = client.subscribe();
//! client.place_call("(555) 123-4567").await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let ClientEvent::CallAdded { call } = event {
//!         println!("Calling {}", call.remote_address);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Wiring the collaborators
//!
//! The handle implements one trait per collaborator role. Give a clone to
//! each adapter:
//!
//! - [`surface::SurfaceActionSink`] for the call-management surface
//! - [`transport::TransportEventSink`] for the telephony transport
//! - [`registration::PushEventSink`] for the push adapter

pub mod audio;
pub mod call;
pub mod client;
pub mod error;
pub mod events;
pub mod handle;
pub mod registration;
pub mod surface;
pub mod transport;

// Re-export main types
pub use call::{
    CallDirection, CallId, CallInvite, CallSession, CallSnapshot, CallState, CancelledCallInvite, EndedReason,
    InviteSnapshot,
};
pub use client::{ClientBuilder, ClientConfig, EventStream, OrchestratorHandle};
pub use error::{ClientError, ClientResult};
pub use events::{ClientEvent, ClientEventHandler, EventPriority};
pub use handle::{CallHandle, CallUpdate, HandleKind};
pub use registration::{KeyValueStore, MemoryStore, RegistrationKeepAlive};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
