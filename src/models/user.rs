use serde::{Deserialize, Serialize};

/// A user as delivered in READY and message author fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub discriminator: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// The `<@id>` form the service uses when this user is mentioned.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}
