//! Event handling for the presentation layer
//!
//! The orchestrator publishes a [`ClientEvent`] for every logical call
//! transition. Each call event carries a complete [`CallSnapshot`], never a
//! delta, so a renderer can redraw from the event alone.
//!
//! Events are delivered two ways:
//!
//! - **Broadcast channel** - `OrchestratorHandle::subscribe()` or
//!   `event_stream()` for applications that prefer pulling
//! - **Event handler** - implement [`ClientEventHandler`] and register it;
//!   a dedicated dispatcher task calls it, so handler code never runs on the
//!   orchestrator's serialized context
//!
//! # Basic Event Handler
//!
//! ```rust
//! use ahoy_client_core::events::ClientEventHandler;
//! use ahoy_client_core::CallSnapshot;
//! use async_trait::async_trait;
//!
//! struct CallScreen;
//!
//! #[async_trait]
//! impl ClientEventHandler for CallScreen {
//!     async fn on_call_added(&self, call: CallSnapshot) {
//!         println!("Showing call with {}", call.remote_address);
//!     }
//!
//!     async fn on_call_removed(&self, call: CallSnapshot) {
//!         println!("Call {} gone", call.call_id);
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::call::{CallId, CallSnapshot};

/// Event priority levels
///
/// ```rust
/// use ahoy_client_core::events::EventPriority;
///
/// assert!(EventPriority::High > EventPriority::Normal);
/// assert!(EventPriority::Normal > EventPriority::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventPriority {
    /// Routine status (audio route changes)
    Low,
    /// Call state updates
    Normal,
    /// Calls appearing or disappearing, user decisions required
    High,
}

/// Events published to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// A session was created (outbound dial granted or invite accepted)
    CallAdded { call: CallSnapshot },
    /// A session's state or flags changed
    CallUpdated { call: CallSnapshot },
    /// A session was torn down; the snapshot is its final state
    CallRemoved { call: CallSnapshot },
    /// Dialing needs the microphone and the user declined access
    ///
    /// The application can offer to continue without the microphone
    /// (`place_call_without_microphone`) or send the user to settings.
    MicrophoneAccessRequired { remote_address: String },
    /// Audio output switched
    AudioRouteChanged { speaker: bool },
}

impl ClientEvent {
    /// Call the event refers to, if any
    pub fn call_id(&self) -> Option<CallId> {
        match self {
            ClientEvent::CallAdded { call }
            | ClientEvent::CallUpdated { call }
            | ClientEvent::CallRemoved { call } => Some(call.call_id),
            ClientEvent::MicrophoneAccessRequired { .. } | ClientEvent::AudioRouteChanged { .. } => None,
        }
    }

    /// Priority of this event
    pub fn priority(&self) -> EventPriority {
        match self {
            ClientEvent::CallAdded { .. }
            | ClientEvent::CallRemoved { .. }
            | ClientEvent::MicrophoneAccessRequired { .. } => EventPriority::High,
            ClientEvent::CallUpdated { .. } => EventPriority::Normal,
            ClientEvent::AudioRouteChanged { .. } => EventPriority::Low,
        }
    }
}

/// Presentation layer callbacks
///
/// All methods have empty default implementations; override the ones the
/// UI cares about.
#[async_trait]
pub trait ClientEventHandler: Send + Sync {
    async fn on_call_added(&self, _call: CallSnapshot) {}

    async fn on_call_updated(&self, _call: CallSnapshot) {}

    async fn on_call_removed(&self, _call: CallSnapshot) {}

    async fn on_microphone_access_required(&self, _remote_address: String) {}

    async fn on_audio_route_changed(&self, _speaker: bool) {}
}

/// Route one event to the matching handler method
pub(crate) async fn dispatch(handler: &dyn ClientEventHandler, event: ClientEvent) {
    match event {
        ClientEvent::CallAdded { call } => handler.on_call_added(call).await,
        ClientEvent::CallUpdated { call } => handler.on_call_updated(call).await,
        ClientEvent::CallRemoved { call } => handler.on_call_removed(call).await,
        ClientEvent::MicrophoneAccessRequired { remote_address } => {
            handler.on_microphone_access_required(remote_address).await
        }
        ClientEvent::AudioRouteChanged { speaker } => handler.on_audio_route_changed(speaker).await,
    }
}
