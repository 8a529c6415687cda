//! Remote party identity handling
//!
//! Dial strings typed by the user and caller identities supplied by the
//! transport both need normalizing before they are shown to the user or handed
//! to the call-management surface.

use serde::{Deserialize, Serialize};

/// Prefix the transport puts in front of non-PSTN client identities
pub const CLIENT_IDENTITY_PREFIX: &str = "client:";

/// Shown when the transport supplies no caller identity
pub const UNKNOWN_IDENTITY: &str = "Unknown";

/// Kind of remote handle, as understood by the call-management surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Value consists only of decimal digits
    PhoneNumber,
    /// Anything else (client identities, SIP-style names, ...)
    Generic,
}

/// Identity of the remote party
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallHandle {
    pub kind: HandleKind,
    pub value: String,
}

impl CallHandle {
    /// Classify `value` and build a handle for it
    ///
    /// ```rust
    /// use ahoy_client_core::handle::{CallHandle, HandleKind};
    ///
    /// assert_eq!(CallHandle::new("5551234567").kind, HandleKind::PhoneNumber);
    /// assert_eq!(CallHandle::new("alice").kind, HandleKind::Generic);
    /// assert_eq!(CallHandle::new("+15551234567").kind, HandleKind::Generic);
    /// ```
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let kind = if value.chars().all(|c| c.is_ascii_digit()) {
            HandleKind::PhoneNumber
        } else {
            HandleKind::Generic
        };
        Self { kind, value }
    }

    /// Build a handle from a transport-supplied identity, normalizing it first
    pub fn from_remote_identity(identity: Option<&str>) -> Self {
        Self::new(format_remote_identity(identity))
    }
}

/// Strip formatting characters from a user-entered dial string
///
/// ```rust
/// use ahoy_client_core::handle::sanitize_dial_string;
///
/// assert_eq!(sanitize_dial_string("(555) 123-4567"), "5551234567");
/// ```
pub fn sanitize_dial_string(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ' ' | '-'))
        .collect()
}

/// Normalize a transport-supplied identity for display
///
/// ```rust
/// use ahoy_client_core::handle::format_remote_identity;
///
/// assert_eq!(format_remote_identity(Some("client:alice")), "alice");
/// assert_eq!(format_remote_identity(Some("+15551234567")), "+15551234567");
/// assert_eq!(format_remote_identity(None), "Unknown");
/// ```
pub fn format_remote_identity(identity: Option<&str>) -> String {
    identity
        .unwrap_or(UNKNOWN_IDENTITY)
        .replace(CLIENT_IDENTITY_PREFIX, "")
}

/// Description of a call handed to the call-management surface
///
/// The surface uses this to render its call UI and decide which in-call
/// controls to offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallUpdate {
    pub remote_handle: CallHandle,
    pub supports_dtmf: bool,
    pub supports_holding: bool,
    pub supports_grouping: bool,
    pub supports_ungrouping: bool,
    pub has_video: bool,
}

impl CallUpdate {
    /// Voice-only update for `remote_handle` with DTMF and hold enabled
    pub fn voice(remote_handle: CallHandle) -> Self {
        Self {
            remote_handle,
            supports_dtmf: true,
            supports_holding: true,
            supports_grouping: false,
            supports_ungrouping: false,
            has_video: false,
        }
    }
}
