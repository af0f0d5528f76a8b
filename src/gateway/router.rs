use serde::de::DeserializeOwned;

use super::events::{event_type, opcode, GatewayMessage, HelloData, ReadyData};
use crate::error::GatewayError;
use crate::models::{Message, User};

/// What the receive loop should do with one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send IDENTIFY, then start heartbeating every `heartbeat_interval` ms.
    Handshake { heartbeat_interval: u64 },
    HeartbeatAck,
    /// Record the authenticated identity.
    Ready(User),
    /// Hand the message to the application handler.
    MessageCreate(Message),
    Ignore,
}

/// Interprets one frame. Does not touch the session; sequence tracking is
/// the caller's job and happens before routing.
///
/// Unknown opcodes and unknown dispatch types map to `Action::Ignore`. A
/// known frame whose payload cannot be decoded is a protocol error.
pub fn route(frame: GatewayMessage) -> Result<Action, GatewayError> {
    match frame.op {
        opcode::HELLO => {
            let hello: HelloData = decode_payload("HELLO", frame.d)?;
            Ok(Action::Handshake {
                heartbeat_interval: hello.heartbeat_interval,
            })
        }
        opcode::HEARTBEAT_ACK => Ok(Action::HeartbeatAck),
        opcode::DISPATCH => route_dispatch(frame.t.as_deref(), frame.d),
        op => {
            tracing::info!("did not handle opcode {op} with data: {:?}", frame.d);
            Ok(Action::Ignore)
        }
    }
}

fn route_dispatch(
    typ: Option<&str>,
    data: Option<serde_json::Value>,
) -> Result<Action, GatewayError> {
    match typ {
        Some(event_type::READY) => {
            let ready: ReadyData = decode_payload(event_type::READY, data)?;
            Ok(Action::Ready(ready.user))
        }
        Some(event_type::MESSAGE_CREATE) => {
            let message: Message = decode_payload(event_type::MESSAGE_CREATE, data)?;
            Ok(Action::MessageCreate(message))
        }
        other => {
            tracing::debug!("ignoring dispatch {other:?}");
            Ok(Action::Ignore)
        }
    }
}

fn decode_payload<T: DeserializeOwned>(
    what: &str,
    data: Option<serde_json::Value>,
) -> Result<T, GatewayError> {
    let data = data.ok_or_else(|| GatewayError::protocol(format!("{what} frame has no data")))?;
    serde_json::from_value(data)
        .map_err(|e| GatewayError::protocol(format!("invalid {what} payload: {e}")))
}
