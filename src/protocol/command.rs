//! DICT commands and the pending-command queue

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use unicode_normalization::UnicodeNormalization;

use super::codec;
use super::types::PendingDefinition;
use crate::common::config::{DEFAULT_DATABASE, DEFAULT_STRATEGY};

/// The requests this client knows how to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Client,
    ShowDatabases,
    ShowStrategies,
    Match,
    Define,
    Quit,
}

impl CommandKind {
    /// The command keyword as sent on the wire
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::ShowDatabases => "SHOW DB",
            Self::ShowStrategies => "SHOW STRAT",
            Self::Match => "MATCH",
            Self::Define => "DEFINE",
            Self::Quit => "QUIT",
        }
    }

    /// Commands issued by the client itself rather than on request
    pub fn is_internal(self) -> bool {
        matches!(self, Self::Client | Self::Quit)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Progress of a command through its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Sent, nothing received yet
    Start,
    /// Waiting for the next status line
    AwaitingStatus,
    /// Inside a text block
    AwaitingData,
    /// Done; the next line completes the command
    Finished,
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::AwaitingStatus => write!(f, "awaiting-status"),
            Self::AwaitingData => write!(f, "awaiting-data"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Identity of a command instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(u64);

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

impl CommandId {
    fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One DICT request and the state of its reply
#[derive(Debug)]
pub struct Command {
    id: CommandId,
    pub kind: CommandKind,
    pub state: CommandState,
    pub database: Option<String>,
    pub strategy: Option<String>,
    pub word: Option<String>,
    /// Definition body collected so far
    pub buffer: String,
    /// Definition being assembled
    pub pending: Option<PendingDefinition>,
}

impl Command {
    fn new(kind: CommandKind) -> Self {
        Self {
            id: CommandId::next(),
            kind,
            state: CommandState::Start,
            database: None,
            strategy: None,
            word: None,
            buffer: String::new(),
            pending: None,
        }
    }

    /// The CLIENT handshake; finishes on the first reply
    pub fn client() -> Self {
        let mut cmd = Self::new(CommandKind::Client);
        cmd.state = CommandState::Finished;
        cmd
    }

    /// QUIT; finishes on the first reply
    pub fn quit() -> Self {
        let mut cmd = Self::new(CommandKind::Quit);
        cmd.state = CommandState::Finished;
        cmd
    }

    pub fn show_databases() -> Self {
        Self::new(CommandKind::ShowDatabases)
    }

    pub fn show_strategies() -> Self {
        Self::new(CommandKind::ShowStrategies)
    }

    /// MATCH `word` in `database` using `strategy`; the word is NFC-normalized
    pub fn match_word(database: Option<&str>, strategy: Option<&str>, word: &str) -> Self {
        let mut cmd = Self::new(CommandKind::Match);
        cmd.database = Some(database.unwrap_or(DEFAULT_DATABASE).to_string());
        cmd.strategy = Some(strategy.unwrap_or(DEFAULT_STRATEGY).to_string());
        cmd.word = Some(word.nfc().collect());
        cmd
    }

    /// DEFINE `word` in `database`; the word is NFC-normalized
    pub fn define_word(database: Option<&str>, word: &str) -> Self {
        let mut cmd = Self::new(CommandKind::Define);
        cmd.database = Some(database.unwrap_or(DEFAULT_DATABASE).to_string());
        cmd.word = Some(word.nfc().collect());
        cmd
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Build the line sent to the server; `client_name` is only used by CLIENT
    pub fn to_line(&self, client_name: &str) -> String {
        let keyword = self.kind.keyword();
        match self.kind {
            CommandKind::Client => format!("{} {}", keyword, codec::quote(client_name)),
            CommandKind::ShowDatabases | CommandKind::ShowStrategies | CommandKind::Quit => {
                keyword.to_string()
            }
            CommandKind::Match => format!(
                "{} {} {} {}",
                keyword,
                self.database.as_deref().unwrap_or(DEFAULT_DATABASE),
                self.strategy.as_deref().unwrap_or(DEFAULT_STRATEGY),
                codec::quote(self.word.as_deref().unwrap_or_default()),
            ),
            CommandKind::Define => format!(
                "{} {} {}",
                keyword,
                self.database.as_deref().unwrap_or(DEFAULT_DATABASE),
                codec::quote(self.word.as_deref().unwrap_or_default()),
            ),
        }
    }
}

/// FIFO of commands waiting to be sent
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `command`; refuses a command that is already queued
    pub fn push(&mut self, command: Command) -> bool {
        if self.contains(command.id()) {
            tracing::warn!(command = %command.kind, "Command already in queue");
            return false;
        }

        tracing::debug!(command = %command.kind, "Pushing command into the queue");
        self.commands.push_back(command);
        true
    }

    /// Remove the oldest command
    pub fn pop(&mut self) -> Option<Command> {
        let command = self.commands.pop_front()?;
        tracing::debug!(command = %command.kind, "Getting command from the queue");
        Some(command)
    }

    pub fn contains(&self, id: CommandId) -> bool {
        self.commands.iter().any(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every queued command
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
