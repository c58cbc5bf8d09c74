// src/models/frames.rs
//
// One frame = one JSON text message on the persistent channel, discriminated
// by its "type" field. Field names follow the dashboard's camelCase wire
// format.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    AgentRegister {
        #[serde(rename = "agentId")]
        agent_id: String,
    },
    RemoteSessionStart {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    RemoteSessionEnd {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    CaptureScreen {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    MouseEvent {
        #[serde(rename = "sessionId")]
        session_id: String,
        data: MouseEventData,
    },
    KeyboardEvent {
        #[serde(rename = "sessionId")]
        session_id: String,
        data: KeyboardEventData,
    },
    ScreenData {
        #[serde(rename = "sessionId")]
        session_id: String,
        /// Base64-encoded JPEG frame.
        data: String,
    },
    Ping,
    Pong,
    /// Frame types this agent does not know. Ignored, never fatal.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MouseEventKind {
    Click,
    Mousedown,
    Mouseup,
    Mousemove,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MouseEventData {
    #[serde(rename = "type")]
    pub kind: MouseEventKind,
    /// Absolute screen coordinates in the capture's native space. The
    /// dashboard rescales click positions before sending; we apply them
    /// literally.
    pub x: i32,
    pub y: i32,
    /// 0 = primary button, anything else = secondary.
    #[serde(default)]
    pub button: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardEventKind {
    Keydown,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyboardEventData {
    #[serde(rename = "type")]
    pub kind: KeyboardEventKind,
    pub key: String,
    #[serde(default, rename = "ctrlKey")]
    pub ctrl_key: bool,
    #[serde(default, rename = "altKey")]
    pub alt_key: bool,
    #[serde(default, rename = "shiftKey")]
    pub shift_key: bool,
}

/// Decode one text frame in two steps.
///
/// Text that is not JSON at all is an `Err`: the receive loop treats it as
/// an I/O-class failure and tears the connection down. Valid JSON that does
/// not match any known frame shape decodes to `None` and is skipped.
pub fn decode_frame(text: &str) -> Result<Option<Frame>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(serde_json::from_value::<Frame>(value).ok())
}
