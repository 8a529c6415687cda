//! Telephony transport interface
//!
//! The telephony transport establishes and tears down the actual audio
//! session. Calls it owns are addressed by the same [`CallId`] the
//! orchestrator uses, so no separate handle type is needed.
//!
//! Progress comes back asynchronously through [`TransportEventSink`]. Sink
//! methods never block: they enqueue the event and return, so a transport may
//! call them from any thread or callback context.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    call::{CallId, CallInvite, CancelledCallInvite},
    error::ClientResult,
};

/// Parameters for an outgoing connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Identifier the transport must use for the new call
    pub call_id: CallId,
    /// Credential the transport presents to its signaling service
    pub access_token: String,
    /// Free-form parameters forwarded to the signaling service
    pub params: HashMap<String, String>,
}

impl ConnectOptions {
    /// Options dialing `to`, with `params["to"]` set
    pub fn dial(call_id: CallId, access_token: impl Into<String>, to: impl Into<String>) -> Self {
        let mut params = HashMap::new();
        params.insert("to".to_string(), to.into());
        Self {
            call_id,
            access_token: access_token.into(),
            params,
        }
    }

    /// Destination address, if present
    pub fn destination(&self) -> Option<&str> {
        self.params.get("to").map(String::as_str)
    }
}

/// Opaque push notification body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPayload(pub Bytes);

impl PushPayload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// What a push payload decoded into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushNotification {
    /// A new inbound call
    Invite(CallInvite),
    /// An inbound call was abandoned before it was answered
    Cancelled {
        cancelled: CancelledCallInvite,
        reason: String,
    },
}

/// Orchestrator → transport
#[async_trait]
pub trait TelephonyTransport: Send + Sync {
    /// Start an outgoing call
    async fn connect(&self, options: ConnectOptions) -> ClientResult<()>;

    /// Accept an invite; the resulting call keeps `invite.id`
    async fn accept(&self, invite: &CallInvite) -> ClientResult<()>;

    /// Decline an invite
    async fn reject(&self, invite: &CallInvite) -> ClientResult<()>;

    /// Tear down a call
    async fn disconnect(&self, call_id: CallId) -> ClientResult<()>;

    /// Mute hint for a transport-owned call
    async fn set_muted(&self, call_id: CallId, muted: bool) -> ClientResult<()>;

    /// Hold hint for a transport-owned call
    async fn set_on_hold(&self, call_id: CallId, on_hold: bool) -> ClientResult<()>;

    /// Send DTMF digits on a call
    async fn send_digits(&self, call_id: CallId, digits: &str) -> ClientResult<()>;

    /// Decode a push payload into a call notification
    fn decode_notification(&self, payload: &PushPayload) -> ClientResult<PushNotification>;
}

/// Transport → orchestrator
pub trait TransportEventSink: Send + Sync {
    /// Media established
    fn call_did_connect(&self, call_id: CallId);

    /// Remote party is alerting (outbound calls)
    fn call_did_start_ringing(&self, call_id: CallId);

    /// Connection attempt failed
    fn call_did_fail_to_connect(&self, call_id: CallId, error: String);

    /// Call disconnected, with an error if the teardown was not clean
    fn call_did_disconnect(&self, call_id: CallId, error: Option<String>);
}
