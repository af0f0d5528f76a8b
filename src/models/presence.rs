use serde::{Deserialize, Serialize};

/// Presence block sent inside IDENTIFY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    pub game: Option<Activity>,
    pub status: String,
    pub since: Option<u64>,
    pub afk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: u8,
}

impl Presence {
    /// An online presence "playing" the given activity name.
    pub fn playing(name: impl Into<String>) -> Self {
        Self {
            game: Some(Activity {
                name: name.into(),
                activity_type: 0,
            }),
            status: "online".to_string(),
            since: None,
            afk: false,
        }
    }
}
