use std::collections::HashMap;

use futures_util::future::BoxFuture;
use thiserror::Error;

use super::Bot;
use crate::error::RestError;
use crate::gateway::GatewayConnection;
use crate::models::Message;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("incorrect usage: {0}")]
    IncorrectUsage(String),
    #[error(transparent)]
    Rest(#[from] RestError),
}

/// Everything a command needs to answer one message.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    pub bot: &'a Bot,
    pub conn: &'a GatewayConnection,
    pub message: &'a Message,
    /// Lower-cased words after the command name.
    pub args: &'a [String],
}

pub type CommandFn = for<'a> fn(Invocation<'a>) -> BoxFuture<'a, Result<(), CommandError>>;

#[derive(Clone)]
pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
    pub run: CommandFn,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .finish()
    }
}

/// Command name to command, filled by explicit `register` calls at startup.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command. A later registration under the same name replaces the
    /// earlier one.
    pub fn register(&mut self, command: Command) -> &mut Self {
        if self.commands.insert(command.name, command).is_some() {
            tracing::warn!("command registered twice, keeping the latest");
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands ordered by usage string.
    pub fn sorted(&self) -> Vec<&Command> {
        let mut commands: Vec<&Command> = self.commands.values().collect();
        commands.sort_by_key(|c| c.usage);
        commands
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
