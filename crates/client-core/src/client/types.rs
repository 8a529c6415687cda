//! Messages for the orchestrator loop
//!
//! Every public entry point (presentation intents, surface hooks, transport
//! callbacks, push notifications) becomes one [`Command`] delivered to the
//! single task that owns call state. Replies travel back over `oneshot`
//! channels.

use tokio::sync::oneshot;

use crate::{
    call::{CallId, CallSnapshot, InviteSnapshot},
    error::ClientResult,
    surface::SurfaceAction,
    transport::{PushNotification, PushPayload},
};

/// Reply channel for a command
pub(crate) type Responder<T> = oneshot::Sender<ClientResult<T>>;

/// Progress reported by the telephony transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransportEvent {
    Connected { call_id: CallId },
    Ringing { call_id: CallId },
    FailedToConnect { call_id: CallId, error: String },
    Disconnected { call_id: CallId, error: Option<String> },
}

/// Provider lifecycle callbacks from the call surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProviderEvent {
    Began,
    Reset,
    AudioActivated,
    AudioDeactivated,
    TimedOut(SurfaceAction),
}

/// Work waiting for the transport to report a connection outcome
#[derive(Debug)]
pub(crate) enum PendingCompletion {
    /// Outbound dial; on success the surface is told the call connected
    Dial,
    /// Answered invite; the surface's answer action is fulfilled or failed
    Answer(Responder<()>),
}

#[derive(Debug)]
pub(crate) enum Command {
    // Presentation intents
    PlaceCall {
        remote_address: String,
        reply: Responder<CallId>,
    },
    MicrophoneAccessRequired {
        remote_address: String,
    },
    EndCall {
        call_id: CallId,
        reply: Responder<()>,
    },
    SetHold {
        call_id: CallId,
        on_hold: bool,
        reply: Responder<()>,
    },
    SetMute {
        call_id: CallId,
        muted: bool,
        reply: Responder<()>,
    },
    PlayDigits {
        call_id: CallId,
        digits: String,
        reply: Responder<()>,
    },
    ToggleAudioRoute {
        to_speaker: bool,
        reply: Responder<()>,
    },

    // Call surface
    Perform {
        action: SurfaceAction,
        reply: Responder<()>,
    },
    TransactionFinished {
        action: SurfaceAction,
        result: ClientResult<()>,
    },
    Provider(ProviderEvent),

    // Telephony transport
    Transport(TransportEvent),

    // Push transport
    PushPayload {
        payload: PushPayload,
        reply: Responder<()>,
    },
    Push {
        notification: PushNotification,
        reply: Responder<()>,
    },

    // Queries
    ActiveCalls {
        reply: Responder<Vec<CallSnapshot>>,
    },
    GetCall {
        call_id: CallId,
        reply: Responder<CallSnapshot>,
    },
    PendingInvites {
        reply: Responder<Vec<InviteSnapshot>>,
    },
    SpeakerOutput {
        reply: Responder<bool>,
    },
    AudioEnabled {
        reply: Responder<bool>,
    },

    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
