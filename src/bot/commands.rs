use chrono::Utc;
use futures_util::future::BoxFuture;

use super::command::{Command, CommandError, CommandRegistry, Invocation};
use crate::models::{CreateMessage, Embed, EmbedField};

/// The commands every deployment ships with.
pub fn builtin() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .register(Command {
            name: "help",
            usage: "help",
            description: "Displays this help",
            run: help,
        })
        .register(Command {
            name: "info",
            usage: "info",
            description: "Displays bot info",
            run: info,
        })
        .register(Command {
            name: "status",
            usage: "status",
            description: "Displays bot status",
            run: status,
        });
    registry
}

fn help(inv: Invocation<'_>) -> BoxFuture<'_, Result<(), CommandError>> {
    Box::pin(async move {
        inv.conn
            .rest()
            .send_message(&inv.message.channel_id, inv.bot.help_message())
            .await?;
        Ok(())
    })
}

fn info(inv: Invocation<'_>) -> BoxFuture<'_, Result<(), CommandError>> {
    Box::pin(async move {
        inv.conn
            .rest()
            .send_message(&inv.message.channel_id, inv.bot.info_message())
            .await?;
        Ok(())
    })
}

fn status(inv: Invocation<'_>) -> BoxFuture<'_, Result<(), CommandError>> {
    Box::pin(async move {
        if !inv.args.is_empty() {
            return Err(CommandError::IncorrectUsage("status takes no arguments".to_string()));
        }
        let uptime = inv
            .conn
            .session()
            .connected_since()
            .map(|since| format_uptime((Utc::now() - since).num_seconds()))
            .unwrap_or_else(|| "not connected".to_string());

        let reply = CreateMessage::default().with_embed(Embed {
            fields: vec![
                EmbedField::new(
                    "System",
                    format!(
                        "Version: {} ({})\nBuilt for: {}",
                        env!("CARGO_PKG_VERSION"),
                        env!("GIT_SHA"),
                        env!("BUILD_TARGET")
                    ),
                ),
                EmbedField::new("Uptime", uptime),
            ],
            ..Embed::default()
        });
        inv.conn
            .rest()
            .send_message(&inv.message.channel_id, &reply)
            .await?;
        Ok(())
    })
}

pub(crate) fn format_uptime(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let secs = total_secs % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {secs}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
