use serde::{Deserialize, Serialize};

use super::user::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: i64,
    pub guild_id: Option<String>,
    pub name: Option<String>,
    pub topic: Option<String>,
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub recipients: Vec<User>,
}

impl Channel {
    /// DM channels have type 1.
    pub fn is_dm(&self) -> bool {
        self.channel_type == 1
    }
}

/// Body of `POST /users/@me/channels`.
#[derive(Debug, Serialize)]
pub struct CreateDmChannel<'a> {
    pub recipient_id: &'a str,
}
