//! Audio routing and microphone permission
//!
//! Audio output is a process-wide preference rather than a per-call setting,
//! and the audio device itself is enabled or disabled by the call surface as
//! it activates and deactivates the audio session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

/// Where call audio is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioOutput {
    /// Built-in receiver (the default for voice calls)
    Receiver,
    /// Loudspeaker
    Speaker,
}

impl AudioOutput {
    pub fn from_speaker(to_speaker: bool) -> Self {
        if to_speaker {
            AudioOutput::Speaker
        } else {
            AudioOutput::Receiver
        }
    }
}

/// Microphone permission as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordPermission {
    Granted,
    Denied,
    /// The user has not been asked yet
    Undetermined,
}

/// Platform audio session
#[async_trait]
pub trait AudioRouter: Send + Sync {
    /// Enable or disable the transport's audio device
    async fn set_device_enabled(&self, enabled: bool);

    /// Override the output port
    async fn override_output(&self, output: AudioOutput) -> ClientResult<()>;

    /// Current microphone permission
    fn record_permission(&self) -> RecordPermission;

    /// Prompt the user for microphone permission; `true` when granted
    async fn request_record_permission(&self) -> bool;
}

/// Resolve the microphone permission, prompting when it is undetermined
pub(crate) async fn ensure_record_permission(router: &dyn AudioRouter) -> bool {
    match router.record_permission() {
        RecordPermission::Granted => true,
        RecordPermission::Denied => false,
        RecordPermission::Undetermined => {
            tracing::debug!("Requesting microphone permission");
            router.request_record_permission().await
        }
    }
}

/// Audio state owned by the orchestrator loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AudioState {
    pub device_enabled: bool,
    pub speaker_output: bool,
}
