//! Error types for the client-core library
//!
//! Every failure the orchestrator can observe maps onto one of these variants.
//! None of them is fatal: the orchestrator logs the error, answers the
//! collaborator that asked, and keeps serving the next command.
//!
//! # Error Categories
//!
//! - **Denied requests** - the call-management surface refused a transition
//! - **Unmatched identifiers** - an action named a call or invite we do not track
//! - **Transport failures** - the telephony transport could not connect or act
//! - **Permission denial** - the microphone is not available to the app
//!
//! # Examples
//!
//! ```rust
//! use ahoy_client_core::{ClientError, CallId};
//!
//! let call_id = CallId::new_v4();
//! let error = ClientError::CallNotFound { call_id };
//!
//! assert_eq!(error.category(), "call");
//! assert!(!error.is_recoverable());
//! ```

use thiserror::Error;

use crate::call::{CallId, CallState};

/// Result type for client-core operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while orchestrating calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The call-management surface refused the requested transition
    #[error("{action} request denied: {reason}")]
    RequestDenied {
        /// Name of the requested action (e.g. "start", "end")
        action: String,
        /// Reason supplied by the surface
        reason: String,
    },

    /// No session exists for the given identifier
    #[error("Call not found: {call_id}")]
    CallNotFound { call_id: CallId },

    /// No pending invite exists for the given identifier
    #[error("Call invite not found: {call_id}")]
    InviteNotFound { call_id: CallId },

    /// A session or invite with this identifier is already tracked
    #[error("Call already exists: {call_id}")]
    DuplicateCall { call_id: CallId },

    /// The dial string is empty after normalization
    #[error("Invalid remote address: {address:?}")]
    InvalidAddress { address: String },

    /// The state machine does not allow this transition
    #[error("Invalid state transition for call {call_id}: {from:?} -> {to:?}")]
    InvalidStateTransition {
        call_id: CallId,
        from: CallState,
        to: CallState,
    },

    /// The telephony transport failed to perform an operation
    #[error("Transport failure: {reason}")]
    TransportFailure { reason: String },

    /// The call-management surface failed to accept a report
    #[error("Call surface failure: {reason}")]
    SurfaceFailure { reason: String },

    /// Recording permission was denied by the user
    #[error("Microphone permission denied")]
    MicrophonePermissionDenied,

    /// Audio routing could not be changed
    #[error("Audio route error: {message}")]
    AudioRoute { message: String },

    /// Configuration is invalid
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Persisted key-value state could not be read or written
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// The orchestrator loop is no longer running
    #[error("Orchestrator has stopped")]
    OrchestratorStopped,

    /// Internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ClientError {
    /// Create a denied-request error
    pub fn denied(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequestDenied {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport failure
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::TransportFailure {
            reason: reason.into(),
        }
    }

    /// Create a call surface failure
    pub fn surface(reason: impl Into<String>) -> Self {
        Self::SurfaceFailure {
            reason: reason.into(),
        }
    }

    /// Create an audio route error
    pub fn audio_route(message: impl Into<String>) -> Self {
        Self::AudioRoute {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later could succeed
    ///
    /// The orchestrator itself never retries; this is a hint for the
    /// presentation layer deciding whether to offer a "try again" affordance.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::RequestDenied { .. }
            | ClientError::TransportFailure { .. }
            | ClientError::SurfaceFailure { .. }
            | ClientError::AudioRoute { .. } => true,

            ClientError::CallNotFound { .. }
            | ClientError::InviteNotFound { .. }
            | ClientError::DuplicateCall { .. }
            | ClientError::InvalidAddress { .. }
            | ClientError::InvalidStateTransition { .. }
            | ClientError::MicrophonePermissionDenied
            | ClientError::InvalidConfiguration { .. }
            | ClientError::Persistence { .. }
            | ClientError::OrchestratorStopped
            | ClientError::InternalError { .. } => false,
        }
    }

    /// Short category name used in log fields
    pub fn category(&self) -> &'static str {
        match self {
            ClientError::RequestDenied { .. } | ClientError::SurfaceFailure { .. } => "surface",
            ClientError::CallNotFound { .. }
            | ClientError::InviteNotFound { .. }
            | ClientError::DuplicateCall { .. }
            | ClientError::InvalidAddress { .. }
            | ClientError::InvalidStateTransition { .. } => "call",
            ClientError::TransportFailure { .. } => "transport",
            ClientError::MicrophonePermissionDenied | ClientError::AudioRoute { .. } => "audio",
            ClientError::InvalidConfiguration { .. } => "configuration",
            ClientError::Persistence { .. } => "persistence",
            ClientError::OrchestratorStopped | ClientError::InternalError { .. } => "internal",
        }
    }
}
