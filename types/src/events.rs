//! Wire event payloads for the realtime channel.
//!
//! Every inbound event field carries `#[serde(default)]`: a missing or
//! malformed payload field degrades to an empty value instead of failing the
//! event, matching the protocol's tolerance for partial payloads.

use serde::{Deserialize, Serialize};

use crate::{Diagnostic, ErrorRecord, FixResult, GenerationResult};

/// Payload of the inbound `check_code` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckPayload {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
}

/// Payload of the inbound `fix_code` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FixPayload {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub error: Diagnostic,
}

/// Payload of the inbound `autopilot_code` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutopilotPayload {
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub code: String,
}

/// An outbound response event, one per handled inbound event.
///
/// Serializes to the `{"event": <name>, "data": {...}}` envelope the client
/// consumes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    CodeErrors {
        errors: Vec<ErrorRecord>,
        code: String,
    },
    CodeFix {
        error: Diagnostic,
        fix_result: FixResult,
    },
    AutopilotResult {
        line: u32,
        result: GenerationResult,
    },
}
