//! Recording collaborators shared by the orchestrator scenario tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};

use ahoy_client_core::{
    audio::{AudioOutput, AudioRouter, RecordPermission},
    surface::{CallSurface, ProviderConfig, SurfaceAction, SurfaceActionSink},
    transport::{ConnectOptions, PushNotification, PushPayload, TelephonyTransport},
    CallId, CallInvite, CallUpdate, CancelledCallInvite, ClientBuilder, ClientConfig, ClientError, ClientEvent,
    ClientResult, EndedReason, MemoryStore, OrchestratorHandle,
};

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// What the orchestrator told the surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceReport {
    Configured(ProviderConfig),
    Requested(SurfaceAction),
    Incoming(CallId, CallUpdate),
    Updated(CallId, CallUpdate),
    StartedConnecting(CallId),
    Connected(CallId),
    Ended(CallId, EndedReason),
}

/// Call surface that grants requests and performs them through the handle,
/// the way the system surface does
#[derive(Default)]
pub struct MockSurface {
    sink: RwLock<Option<OrchestratorHandle>>,
    denied: Mutex<HashSet<&'static str>>,
    reports: Mutex<Vec<SurfaceReport>>,
    performed: Arc<Mutex<Vec<(SurfaceAction, ClientResult<()>)>>>,
}

impl MockSurface {
    pub async fn attach(&self, handle: OrchestratorHandle) {
        *self.sink.write().await = Some(handle);
    }

    /// Refuse every request for the named action ("start", "end", ...)
    pub fn deny(&self, action: &'static str) {
        self.denied.lock().unwrap().insert(action);
    }

    pub fn reports(&self) -> Vec<SurfaceReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn ended(&self) -> Vec<(CallId, EndedReason)> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                SurfaceReport::Ended(id, reason) => Some((id, reason)),
                _ => None,
            })
            .collect()
    }

    pub fn requested(&self) -> Vec<SurfaceAction> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                SurfaceReport::Requested(action) => Some(action),
                _ => None,
            })
            .collect()
    }

    pub fn performed(&self) -> Vec<(SurfaceAction, ClientResult<()>)> {
        self.performed.lock().unwrap().clone()
    }

    fn report(&self, report: SurfaceReport) {
        self.reports.lock().unwrap().push(report);
    }
}

#[async_trait]
impl CallSurface for MockSurface {
    async fn configure(&self, config: &ProviderConfig) -> ClientResult<()> {
        self.report(SurfaceReport::Configured(config.clone()));
        Ok(())
    }

    async fn request_transaction(&self, action: SurfaceAction) -> ClientResult<()> {
        self.report(SurfaceReport::Requested(action.clone()));

        if self.denied.lock().unwrap().contains(action.name()) {
            return Err(ClientError::denied(action.name(), "denied by test surface"));
        }

        let Some(sink) = self.sink.read().await.clone() else {
            return Err(ClientError::surface("no orchestrator attached"));
        };

        // Grant now, perform afterwards
        let performed = self.performed.clone();
        tokio::spawn(async move {
            let result = match action.clone() {
                SurfaceAction::Start { call_id, handle } => sink.perform_start(call_id, handle).await,
                SurfaceAction::Answer { call_id } => sink.perform_answer(call_id).await,
                SurfaceAction::End { call_id } => sink.perform_end(call_id).await,
                SurfaceAction::SetHeld { call_id, on_hold } => sink.perform_set_held(call_id, on_hold).await,
                SurfaceAction::SetMuted { call_id, muted } => sink.perform_set_muted(call_id, muted).await,
                SurfaceAction::PlayDigits { call_id, digits } => sink.perform_play_digits(call_id, digits).await,
            };
            performed.lock().unwrap().push((action, result));
        });
        Ok(())
    }

    async fn report_new_incoming_call(&self, call_id: CallId, update: CallUpdate) -> ClientResult<()> {
        self.report(SurfaceReport::Incoming(call_id, update));
        Ok(())
    }

    async fn report_call_updated(&self, call_id: CallId, update: CallUpdate) {
        self.report(SurfaceReport::Updated(call_id, update));
    }

    async fn report_outgoing_started_connecting(&self, call_id: CallId, _at: DateTime<Utc>) {
        self.report(SurfaceReport::StartedConnecting(call_id));
    }

    async fn report_outgoing_connected(&self, call_id: CallId, _at: DateTime<Utc>) {
        self.report(SurfaceReport::Connected(call_id));
    }

    async fn report_call_ended(&self, call_id: CallId, _at: DateTime<Utc>, reason: EndedReason) {
        self.report(SurfaceReport::Ended(call_id, reason));
    }
}

/// What the orchestrator asked the transport to do
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOp {
    Connect(ConnectOptions),
    Accept(CallId),
    Reject(CallId),
    Disconnect(CallId),
    Muted(CallId, bool),
    Held(CallId, bool),
    Digits(CallId, String),
}

/// Telephony transport that records operations
///
/// Push payloads are JSON: a serialized [`CallInvite`] or
/// [`CancelledCallInvite`].
#[derive(Default)]
pub struct MockTransport {
    ops: Mutex<Vec<TransportOp>>,
}

impl MockTransport {
    pub fn ops(&self) -> Vec<TransportOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn connected_to(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                TransportOp::Connect(options) => options.destination().map(str::to_string),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: TransportOp) -> ClientResult<()> {
        self.ops.lock().unwrap().push(op);
        Ok(())
    }
}

#[async_trait]
impl TelephonyTransport for MockTransport {
    async fn connect(&self, options: ConnectOptions) -> ClientResult<()> {
        self.record(TransportOp::Connect(options))
    }

    async fn accept(&self, invite: &CallInvite) -> ClientResult<()> {
        self.record(TransportOp::Accept(invite.id))
    }

    async fn reject(&self, invite: &CallInvite) -> ClientResult<()> {
        self.record(TransportOp::Reject(invite.id))
    }

    async fn disconnect(&self, call_id: CallId) -> ClientResult<()> {
        self.record(TransportOp::Disconnect(call_id))
    }

    async fn set_muted(&self, call_id: CallId, muted: bool) -> ClientResult<()> {
        self.record(TransportOp::Muted(call_id, muted))
    }

    async fn set_on_hold(&self, call_id: CallId, on_hold: bool) -> ClientResult<()> {
        self.record(TransportOp::Held(call_id, on_hold))
    }

    async fn send_digits(&self, call_id: CallId, digits: &str) -> ClientResult<()> {
        self.record(TransportOp::Digits(call_id, digits.to_string()))
    }

    fn decode_notification(&self, payload: &PushPayload) -> ClientResult<PushNotification> {
        if let Ok(invite) = serde_json::from_slice::<CallInvite>(payload.as_bytes()) {
            return Ok(PushNotification::Invite(invite));
        }
        serde_json::from_slice::<CancelledCallInvite>(payload.as_bytes())
            .map(|cancelled| PushNotification::Cancelled {
                cancelled,
                reason: "caller cancelled".to_string(),
            })
            .map_err(|e| ClientError::transport(format!("not a call notification: {}", e)))
    }
}

/// Audio router with a fixed permission answer
pub struct MockAudio {
    pub permission: RecordPermission,
    pub grant_on_request: bool,
    pub device_enabled: Mutex<Option<bool>>,
    pub outputs: Mutex<Vec<AudioOutput>>,
}

impl MockAudio {
    pub fn granted() -> Self {
        Self::with_permission(RecordPermission::Granted, true)
    }

    pub fn with_permission(permission: RecordPermission, grant_on_request: bool) -> Self {
        Self {
            permission,
            grant_on_request,
            device_enabled: Mutex::new(None),
            outputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AudioRouter for MockAudio {
    async fn set_device_enabled(&self, enabled: bool) {
        *self.device_enabled.lock().unwrap() = Some(enabled);
    }

    async fn override_output(&self, output: AudioOutput) -> ClientResult<()> {
        self.outputs.lock().unwrap().push(output);
        Ok(())
    }

    fn record_permission(&self) -> RecordPermission {
        self.permission
    }

    async fn request_record_permission(&self) -> bool {
        self.grant_on_request
    }
}

/// A running orchestrator wired to mocks
pub struct TestClient {
    pub client: OrchestratorHandle,
    pub surface: Arc<MockSurface>,
    pub transport: Arc<MockTransport>,
    pub audio: Arc<MockAudio>,
    pub store: Arc<MemoryStore>,
    pub events: broadcast::Receiver<ClientEvent>,
}

impl TestClient {
    pub async fn start() -> Self {
        Self::start_with(MockAudio::granted()).await
    }

    pub async fn start_with(audio: MockAudio) -> Self {
        let surface = Arc::new(MockSurface::default());
        let transport = Arc::new(MockTransport::default());
        let audio = Arc::new(audio);
        let store = Arc::new(MemoryStore::new());

        let client = ClientBuilder::new()
            .config(ClientConfig::new().with_access_token("test-token"))
            .surface(surface.clone())
            .transport(transport.clone())
            .audio(audio.clone())
            .store(store.clone())
            .build()
            .await
            .expect("orchestrator starts");
        surface.attach(client.clone()).await;
        let events = client.subscribe();

        Self {
            client,
            surface,
            transport,
            audio,
            store,
            events,
        }
    }

    /// Next event matching `predicate`, skipping others
    pub async fn next_event(&mut self, predicate: impl Fn(&ClientEvent) -> bool) -> ClientEvent {
        tokio::time::timeout(TIMEOUT, async {
            loop {
                let event = self.events.recv().await.expect("event channel open");
                if predicate(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    /// Every event published so far that has not been consumed
    pub fn drain_events(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Dial and wait until the session exists
    pub async fn dial(&mut self, address: &str) -> CallId {
        let call_id = self.client.place_call(address).await.expect("dial accepted");
        self.next_event(|e| matches!(e, ClientEvent::CallAdded { call } if call.call_id == call_id))
            .await;
        call_id
    }

    /// Dial and bring the call to `Connected`
    pub async fn connected_call(&mut self, address: &str) -> CallId {
        use ahoy_client_core::{transport::TransportEventSink, CallState};

        let call_id = self.dial(address).await;
        self.client.call_did_connect(call_id);
        self.next_event(
            |e| matches!(e, ClientEvent::CallUpdated { call } if call.call_id == call_id && call.state == CallState::Connected),
        )
        .await;
        call_id
    }
}

/// Poll `condition` until it holds or the test times out
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(TIMEOUT, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

pub fn invite(correlation_id: &str, from: &str) -> CallInvite {
    CallInvite::new(CallId::new_v4(), correlation_id, Some(from.to_string()), "client:me")
}
