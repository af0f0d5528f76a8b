pub mod command;
pub mod commands;

use crate::config::BotConfig;
use crate::error::HandlerError;
use crate::gateway::GatewayConnection;
use crate::models::{CreateMessage, Embed, EmbedField, Message};
use command::{CommandError, CommandRegistry, Invocation};

pub const REPOSITORY_URL: &str = "https://github.com/meooow25/cp-discord-bot";

/// Turns chat messages into command invocations.
pub struct Bot {
    config: BotConfig,
    commands: CommandRegistry,
    help_message: CreateMessage,
    info_message: CreateMessage,
}

impl Bot {
    pub fn new(config: BotConfig, commands: CommandRegistry) -> Self {
        tracing::info!("loaded commands: {:?}", commands.names());
        let help_message = build_help_message(&config, &commands);
        let info_message = build_info_message(&config);
        Self {
            config,
            commands,
            help_message,
            info_message,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn help_message(&self) -> &CreateMessage {
        &self.help_message
    }

    pub fn info_message(&self) -> &CreateMessage {
        &self.info_message
    }

    /// Handler for MESSAGE_CREATE events.
    pub async fn on_message(
        &self,
        conn: &GatewayConnection,
        message: &Message,
    ) -> Result<(), HandlerError> {
        if let Some(allowed) = &self.config.allowed_channels {
            if !allowed.contains(&message.channel_id) {
                return Ok(());
            }
        }

        let self_id = conn.session().identity().map(|user| user.id.clone());
        let Some(words) = parse_invocation(&message.content, &self.config.triggers, self_id.as_deref())
        else {
            return Ok(());
        };

        let Some(command) = self.commands.get(&words[0]) else {
            tracing::info!("unsupported command {words:?}");
            return Ok(());
        };

        let inv = Invocation {
            bot: self,
            conn,
            message,
            args: &words[1..],
        };
        match (command.run)(inv).await {
            Ok(()) => Ok(()),
            Err(CommandError::IncorrectUsage(reason)) => {
                tracing::info!("incorrect usage of {}: {reason}", command.name);
                Ok(())
            }
            Err(CommandError::Rest(e)) => Err(e.into()),
        }
    }
}

/// Splits lower-cased content into words and, if the first word is a trigger
/// or a mention of `self_id`, returns the remaining words. At least a
/// command name must follow the activator.
pub fn parse_invocation(content: &str, triggers: &[String], self_id: Option<&str>) -> Option<Vec<String>> {
    let mut words = content.to_lowercase().split_whitespace().map(str::to_string).collect::<Vec<_>>();
    if words.len() < 2 {
        return None;
    }

    let first = words[0].as_str();
    let is_trigger = triggers.iter().any(|t| t == first);
    let is_mention = self_id
        .map(|id| first == format!("<@{id}>") || first == format!("<@!{id}>"))
        .unwrap_or(false);
    if !is_trigger && !is_mention {
        return None;
    }

    words.remove(0);
    Some(words)
}

fn build_help_message(config: &BotConfig, commands: &CommandRegistry) -> CreateMessage {
    let content = match config.triggers.first() {
        None => "*@mention me to activate me.*\n".to_string(),
        Some(trigger) => format!("*@mention me or use my trigger `{trigger}` to activate me.*\n"),
    };
    let fields = commands
        .sorted()
        .into_iter()
        .map(|c| EmbedField::new(format!("`{}`", c.usage), c.description))
        .collect();

    CreateMessage::text(content).with_embed(Embed {
        title: Some("Supported commands:".to_string()),
        fields,
        ..Embed::default()
    })
}

fn build_info_message(config: &BotConfig) -> CreateMessage {
    let author = config
        .author_id
        .as_deref()
        .map(|id| format!(" by <@{id}>"))
        .unwrap_or_default();

    CreateMessage::default().with_embed(Embed {
        title: Some(format!("*Hello, I am **{}**!*", config.name)),
        description: Some(format!(
            "*A half-baked bot made{author}\nWritten in Rust\nCheck me out on [Github]({REPOSITORY_URL})!*"
        )),
        ..Embed::default()
    })
}
