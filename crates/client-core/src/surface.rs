//! Call-management surface interface
//!
//! The call-management surface is the privileged system facility that owns
//! the call UI (ringing screen, lock-screen controls) and arbitrates audio.
//! Every lifecycle change goes through it in two halves:
//!
//! 1. The orchestrator *requests* a transaction ([`CallSurface::request_transaction`]).
//! 2. If the surface grants it, the surface asks the orchestrator to *perform*
//!    the action through [`SurfaceActionSink`], and the orchestrator answers
//!    with success or failure.
//!
//! ```text
//! ┌──────────────┐  request_transaction  ┌──────────────────┐
//! │ Orchestrator │ ────────────────────► │   CallSurface    │
//! │              │ ◄──────────────────── │                  │
//! └──────────────┘  perform_* (sink)     └──────────────────┘
//! ```
//!
//! The surface also receives one-way reports: new incoming calls, outgoing
//! progress and ended calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    call::{CallId, EndedReason},
    error::ClientResult,
    handle::{CallHandle, CallUpdate, HandleKind},
};

/// Static configuration handed to the surface when the orchestrator starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Maximum number of simultaneous call groups
    pub max_call_groups: usize,
    /// Maximum number of calls per group
    pub max_calls_per_group: usize,
    /// Handle kinds the surface should accept
    pub supported_handle_kinds: Vec<HandleKind>,
    /// Whether video calls are supported
    pub supports_video: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            max_call_groups: 2,
            max_calls_per_group: 1,
            supported_handle_kinds: vec![HandleKind::PhoneNumber, HandleKind::Generic],
            supports_video: false,
        }
    }
}

/// Transactions the orchestrator can request from the surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceAction {
    /// Start an outgoing call
    Start { call_id: CallId, handle: CallHandle },
    /// Answer an incoming call
    Answer { call_id: CallId },
    /// End a call or decline an invite
    End { call_id: CallId },
    /// Change hold state
    SetHeld { call_id: CallId, on_hold: bool },
    /// Change mute state
    SetMuted { call_id: CallId, muted: bool },
    /// Play DTMF digits
    PlayDigits { call_id: CallId, digits: String },
}

impl SurfaceAction {
    /// Call this action applies to
    pub fn call_id(&self) -> CallId {
        match self {
            SurfaceAction::Start { call_id, .. }
            | SurfaceAction::Answer { call_id }
            | SurfaceAction::End { call_id }
            | SurfaceAction::SetHeld { call_id, .. }
            | SurfaceAction::SetMuted { call_id, .. }
            | SurfaceAction::PlayDigits { call_id, .. } => *call_id,
        }
    }

    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceAction::Start { .. } => "start",
            SurfaceAction::Answer { .. } => "answer",
            SurfaceAction::End { .. } => "end",
            SurfaceAction::SetHeld { .. } => "set-held",
            SurfaceAction::SetMuted { .. } => "set-muted",
            SurfaceAction::PlayDigits { .. } => "play-digits",
        }
    }
}

/// Orchestrator → surface
///
/// Implementations must not wait for an orchestrator reply from inside the
/// `report_*` methods: those run on the orchestrator's serialized context.
/// `request_transaction` is always invoked from a separate task, so it may
/// call back into [`SurfaceActionSink`] and await the answer.
#[async_trait]
pub trait CallSurface: Send + Sync {
    /// Apply the provider configuration (called once at startup)
    async fn configure(&self, config: &ProviderConfig) -> ClientResult<()>;

    /// Ask the surface to perform `action`
    ///
    /// `Ok(())` means the surface granted the request; it will invoke the
    /// matching `perform_*` hook. An error means the request was denied.
    async fn request_transaction(&self, action: SurfaceAction) -> ClientResult<()>;

    /// Tell the surface about a new incoming call so it can ring
    async fn report_new_incoming_call(&self, call_id: CallId, update: CallUpdate) -> ClientResult<()>;

    /// Refresh the surface's description of an existing call
    async fn report_call_updated(&self, call_id: CallId, update: CallUpdate);

    /// An outgoing call started connecting
    async fn report_outgoing_started_connecting(&self, call_id: CallId, at: DateTime<Utc>);

    /// An outgoing call finished connecting
    async fn report_outgoing_connected(&self, call_id: CallId, at: DateTime<Utc>);

    /// A call ended for a reason the surface does not know about yet
    async fn report_call_ended(&self, call_id: CallId, at: DateTime<Utc>, reason: EndedReason);
}

/// Surface → orchestrator
///
/// Every `perform_*` hook answers the surface with `Ok(())` to fulfill the
/// action or an error to fail it.
#[async_trait]
pub trait SurfaceActionSink: Send + Sync {
    /// Start an outgoing call the surface has granted
    async fn perform_start(&self, call_id: CallId, handle: CallHandle) -> ClientResult<()>;

    /// Answer a pending invite
    ///
    /// Resolves once the transport reports the answered call connected (or
    /// failed).
    async fn perform_answer(&self, call_id: CallId) -> ClientResult<()>;

    /// End a call or decline an invite
    async fn perform_end(&self, call_id: CallId) -> ClientResult<()>;

    /// Apply a hold change
    async fn perform_set_held(&self, call_id: CallId, on_hold: bool) -> ClientResult<()>;

    /// Apply a mute change
    async fn perform_set_muted(&self, call_id: CallId, muted: bool) -> ClientResult<()>;

    /// Send DTMF digits
    async fn perform_play_digits(&self, call_id: CallId, digits: String) -> ClientResult<()>;

    /// Provider began operating
    async fn did_begin(&self);

    /// Provider discarded all of its calls
    async fn did_reset(&self);

    /// The surface activated the audio session
    async fn did_activate_audio(&self);

    /// The surface deactivated the audio session
    async fn did_deactivate_audio(&self);

    /// The surface gave up waiting for an action to be fulfilled
    async fn timed_out_performing(&self, action: SurfaceAction);
}
