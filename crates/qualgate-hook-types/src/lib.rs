//! Serde types for the hook event envelope sent by the host assistant.
//!
//! The host invokes qualgate as a post-edit hook and writes one JSON event to
//! stdin. This crate only defines the wire shape; extraction rules (which
//! tools count as writes, how files are de-duplicated) live in the CLI crate.

use serde::{Deserialize, Serialize};

/// One hook invocation event as delivered by the host.
///
/// Unknown top-level fields are ignored so the envelope can grow without
/// breaking older qualgate binaries. Required-field presence is enforced by
/// the event parser, not here; serde only rejects wrong *types*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookEvent {
    /// Host session identifier. Must be non-empty.
    #[serde(default)]
    pub session_id: String,

    /// Working directory the host was in when the event fired. Must be non-empty.
    #[serde(default)]
    pub cwd: String,

    /// Event name, e.g. `PostToolUse`. Must be non-empty.
    #[serde(default)]
    pub hook_event_name: String,

    /// Path to the session transcript, when the host provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,

    /// The tool invocation that triggered this event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<ToolUse>,
}

/// Descriptor of the tool call embedded in a hook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Tool name as reported by the host (e.g. `Edit`, `Write`, `Bash`).
    #[serde(default)]
    pub name: String,

    /// The tool's input payload, kept as raw JSON. Write-capable tools carry
    /// a `file_path` field here; other tools carry arbitrary shapes.
    #[serde(default)]
    pub input: serde_json::Value,
}
