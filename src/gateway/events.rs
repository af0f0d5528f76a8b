use serde::{Deserialize, Serialize};

use crate::models::{Presence, User};

/// Opcodes for gateway messages.
pub mod opcode {
    pub const DISPATCH: u64 = 0;
    pub const HEARTBEAT: u64 = 1;
    pub const IDENTIFY: u64 = 2;
    pub const PRESENCE_UPDATE: u64 = 3;
    pub const VOICE_STATE_UPDATE: u64 = 4;
    pub const RESUME: u64 = 6;
    pub const RECONNECT: u64 = 7;
    pub const REQUEST_GUILD_MEMBERS: u64 = 8;
    pub const INVALID_SESSION: u64 = 9;
    pub const HELLO: u64 = 10;
    pub const HEARTBEAT_ACK: u64 = 11;
}

/// Dispatch event types the client acts on.
pub mod event_type {
    pub const READY: &str = "READY";
    pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
}

pub const GATEWAY_VERSION: u8 = 6;
pub const GATEWAY_ENCODING: &str = "json";

/// Gateway message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: u64,
    #[serde(default)]
    pub d: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayMessage {
    /// A heartbeat frame. `d` is `null` until a dispatch frame has been seen.
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            op: opcode::HEARTBEAT,
            d: Some(last_sequence.map_or(serde_json::Value::Null, Into::into)),
            s: None,
            t: None,
        }
    }

    pub fn identify(data: &IdentifyData) -> Result<Self, serde_json::Error> {
        Ok(Self {
            op: opcode::IDENTIFY,
            d: Some(serde_json::to_value(data)?),
            s: None,
            t: None,
        })
    }
}

/// HELLO payload data.
#[derive(Debug, Clone, Deserialize)]
pub struct HelloData {
    pub heartbeat_interval: u64,
}

/// READY payload data.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyData {
    pub user: User,
}

/// IDENTIFY payload data.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyData {
    pub token: String,
    pub properties: ConnectionProperties,
    pub compress: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionProperties {
    #[serde(rename = "$os")]
    pub os: String,
    #[serde(rename = "$browser")]
    pub browser: String,
    #[serde(rename = "$device")]
    pub device: String,
}

impl ConnectionProperties {
    pub fn current(client_name: &str) -> Self {
        Self {
            os: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            browser: client_name.to_string(),
            device: client_name.to_string(),
        }
    }
}
