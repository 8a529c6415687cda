//! Call data model
//!
//! This module defines the records the orchestrator keeps for every call it
//! knows about:
//!
//! - [`CallSession`] - an active or in-progress call, created by a local dial
//!   or by accepting an invite
//! - [`CallInvite`] - an inbound call that has not been answered yet
//! - [`CallSnapshot`] - the immutable view published to the presentation layer
//!
//! # Call State Machine
//!
//! ```text
//!   Connecting ──► Ringing ──► Connected ──► Disconnecting ──► [removed]
//!       │                          ▲               ▲
//!       └──────────────────────────┘               │
//!       └──────────────────────────────────────────┘
//! ```
//!
//! Inbound calls never enter `Ringing`: the call surface shows its own ringing
//! UI before a session exists. Nothing leaves `Disconnecting` except removal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Unique identifier for a call
///
/// Assigned locally for outbound calls and taken from the transport's invite
/// for inbound calls. It is fixed when the record is created.
pub type CallId = uuid::Uuid;

/// Direction of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallDirection {
    /// Call placed by the local user
    Outbound,
    /// Call received from a remote party
    Inbound,
}

/// Lifecycle state of a call session
///
/// # Examples
///
/// ```rust
/// use ahoy_client_core::CallState;
///
/// assert!(CallState::Connecting.can_transition_to(CallState::Ringing));
/// assert!(CallState::Connecting.can_transition_to(CallState::Connected));
/// assert!(!CallState::Disconnecting.can_transition_to(CallState::Connected));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// Transport connection started, no progress reported yet
    Connecting,
    /// Remote party's device is alerting (outbound only)
    Ringing,
    /// Media established
    Connected,
    /// Local hang-up issued, transport teardown pending
    Disconnecting,
}

impl CallState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: CallState) -> bool {
        use CallState::*;
        matches!(
            (self, next),
            (Connecting, Ringing)
                | (Connecting, Connected)
                | (Connecting, Disconnecting)
                | (Ringing, Connected)
                | (Ringing, Disconnecting)
                | (Connected, Disconnecting)
        )
    }

    /// Whether hold and mute toggles are meaningful in this state
    pub fn allows_media_controls(self) -> bool {
        self == CallState::Connected
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallState::Connecting => write!(f, "Connecting"),
            CallState::Ringing => write!(f, "Ringing"),
            CallState::Connected => write!(f, "Connected"),
            CallState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Why a call ended, as reported to the call-management surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndedReason {
    /// The call failed to connect or dropped with an error
    Failed,
    /// The remote party hung up
    RemoteEnded,
    /// The call was never answered
    Unanswered,
    /// Answered on another device
    AnsweredElsewhere,
    /// Declined on another device
    DeclinedElsewhere,
}

/// The orchestrator's record of an active or in-progress call
#[derive(Debug, Clone)]
pub struct CallSession {
    id: CallId,
    direction: CallDirection,
    remote_address: String,
    state: CallState,
    /// Microphone muted
    pub is_muted: bool,
    /// Call placed on hold
    pub is_on_hold: bool,
    /// Hang-up was requested locally and the surface already knows about it
    pub user_initiated_teardown: bool,
    created_at: DateTime<Utc>,
    connected_at: Option<DateTime<Utc>>,
}

impl CallSession {
    /// Create an outbound session in the `Connecting` state
    pub fn outbound(id: CallId, remote_address: impl Into<String>) -> Self {
        Self::new(id, CallDirection::Outbound, remote_address.into())
    }

    /// Create an inbound session (from an accepted invite) in the `Connecting` state
    pub fn inbound(id: CallId, remote_address: impl Into<String>) -> Self {
        Self::new(id, CallDirection::Inbound, remote_address.into())
    }

    fn new(id: CallId, direction: CallDirection, remote_address: String) -> Self {
        Self {
            id,
            direction,
            remote_address,
            state: CallState::Connecting,
            is_muted: false,
            is_on_hold: false,
            user_initiated_teardown: false,
            created_at: Utc::now(),
            connected_at: None,
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// Move to `next`, enforcing the state machine
    ///
    /// Inbound sessions reject `Ringing`. Returns the previous state.
    pub fn transition_to(&mut self, next: CallState) -> ClientResult<CallState> {
        let inbound_ringing = self.direction == CallDirection::Inbound && next == CallState::Ringing;
        if inbound_ringing || !self.state.can_transition_to(next) {
            return Err(ClientError::InvalidStateTransition {
                call_id: self.id,
                from: self.state,
                to: next,
            });
        }

        let previous = self.state;
        self.state = next;
        if next == CallState::Connected {
            self.connected_at = Some(Utc::now());
        }
        Ok(previous)
    }

    /// Immutable view of the session for the presentation layer
    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            call_id: self.id,
            direction: self.direction,
            remote_address: self.remote_address.clone(),
            state: self.state,
            is_muted: self.is_muted,
            is_on_hold: self.is_on_hold,
            created_at: self.created_at,
            connected_at: self.connected_at,
        }
    }
}

/// Full, immutable copy of a session at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub call_id: CallId,
    pub direction: CallDirection,
    /// Remote identity, already normalized for display
    pub remote_address: String,
    pub state: CallState,
    pub is_muted: bool,
    pub is_on_hold: bool,
    pub created_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
}

/// A pending, not-yet-accepted inbound call
///
/// `id` correlates with later surface actions (answer/end). `correlation_id`
/// is the transport-level identifier carried by cancellation notices, which
/// do not repeat `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInvite {
    pub id: CallId,
    pub correlation_id: String,
    /// Raw caller identity as supplied by the transport
    pub from: Option<String>,
    pub to: String,
    pub received_at: DateTime<Utc>,
}

impl CallInvite {
    pub fn new(id: CallId, correlation_id: impl Into<String>, from: Option<String>, to: impl Into<String>) -> Self {
        Self {
            id,
            correlation_id: correlation_id.into(),
            from,
            to: to.into(),
            received_at: Utc::now(),
        }
    }
}

/// Notice that the caller abandoned an invite before it was answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledCallInvite {
    pub correlation_id: String,
    pub from: Option<String>,
    pub to: String,
}

/// Snapshot of a pending invite, for queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteSnapshot {
    pub call_id: CallId,
    pub correlation_id: String,
    pub remote_address: String,
    pub received_at: DateTime<Utc>,
}
