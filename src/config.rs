use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://discordapp.com/api";
pub const DEFAULT_NAME: &str = "CPBot";
pub const DEFAULT_MAX_HANDLERS: usize = 64;

/// Settings for the gateway client and its REST companion.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub token: String,
    pub api_url: String,
    /// Sent as the User-Agent on REST calls.
    pub name: String,
    /// When set, IDENTIFY carries a presence "playing" this name.
    pub activity_name: Option<String>,
    /// Upper bound on handler tasks running at once.
    pub max_in_flight_handlers: usize,
}

impl GatewayConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            name: DEFAULT_NAME.to_string(),
            activity_name: None,
            max_in_flight_handlers: DEFAULT_MAX_HANDLERS,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_activity(mut self, name: impl Into<String>) -> Self {
        self.activity_name = Some(name.into());
        self
    }
}

/// Settings for the command front-end.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub name: String,
    pub author_id: Option<String>,
    /// Lower-cased prefixes that activate the bot besides a mention.
    pub triggers: Vec<String>,
    /// When set, messages from other channels are ignored.
    pub allowed_channels: Option<Vec<String>>,
}

pub struct Config {
    pub gateway: GatewayConfig,
    pub bot: BotConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("CPBOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let name = std::env::var("CPBOT_NAME").unwrap_or_else(|_| DEFAULT_NAME.to_string());

        let gateway = GatewayConfig {
            token,
            api_url: std::env::var("CPBOT_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            name: name.clone(),
            activity_name: std::env::var("CPBOT_ACTIVITY")
                .ok()
                .filter(|a| !a.is_empty()),
            max_in_flight_handlers: std::env::var("CPBOT_MAX_HANDLERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_MAX_HANDLERS),
        };

        let bot = BotConfig {
            name,
            author_id: std::env::var("CPBOT_AUTHOR_ID").ok().filter(|a| !a.is_empty()),
            triggers: std::env::var("CPBOT_TRIGGERS")
                .map(|v| split_list(&v).into_iter().map(|t| t.to_lowercase()).collect())
                .unwrap_or_default(),
            allowed_channels: std::env::var("CPBOT_ALLOWED_CHANNELS")
                .ok()
                .map(|v| split_list(&v)),
        };

        Ok(Self { gateway, bot })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
