//! Reply parser and command state machine
//!
//! The engine never touches a socket. Each line received from the server
//! goes through [`Engine::handle_line`], which advances the active
//! command and returns the resulting [`Action`]s in the order they must
//! be carried out.

use super::codec;
use super::command::{Command, CommandKind, CommandQueue, CommandState};
use super::status::{self, StatusCode};
use super::types::{Database, Match, Notification, PendingDefinition, Strategy};
use crate::common::Error;

/// Something the connection owner must do after a line was parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Deliver a notification
    Notify(Notification),
    /// Send a command line (without terminator)
    Send(String),
    /// Tear down the connection
    Close,
}

/// Protocol state for one connection
#[derive(Debug)]
pub struct Engine {
    /// `host:port`, used in error messages
    server: String,
    client_name: String,
    /// Last accepted status
    status: Option<StatusCode>,
    /// Status the whitelist is keyed on; cleared at the end of a text block
    guard: Option<StatusCode>,
    /// Command awaiting its reply
    command: Option<Command>,
    queue: CommandQueue,
}

impl Engine {
    pub fn new(server: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            client_name: client_name.into(),
            status: None,
            guard: None,
            command: None,
            queue: CommandQueue::new(),
        }
    }

    /// Queue a command behind any pending ones
    pub fn enqueue(&mut self, command: Command) -> bool {
        self.queue.push(command)
    }

    /// Last status accepted from the server
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn active_command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Whether the connection is winding down after QUIT
    pub fn is_quitting(&self) -> bool {
        self.command
            .as_ref()
            .is_some_and(|c| c.kind == CommandKind::Quit)
    }

    /// Forget the active command, the queue and the status history
    pub fn reset(&mut self) {
        if self.command.is_some() || !self.queue.is_empty() {
            tracing::debug!(
                queued = self.queue.len(),
                active = self.command.is_some(),
                "Discarding pending commands"
            );
        }
        self.command = None;
        self.queue.clear();
        self.status = None;
        self.guard = None;
    }

    /// Parse one line from the server
    pub fn handle_line(&mut self, line: &str) -> Vec<Action> {
        let status = status::classify(line, self.guard);
        match status {
            Some(code) => {
                tracing::debug!(status = %code, "New status");
                self.status = Some(code);
                self.guard = Some(code);
            }
            None if codec::is_terminator(line) => self.guard = None,
            None => {}
        }

        let mut actions = Vec::new();

        let Some(mut command) = self.command.take() else {
            self.handle_greeting(line, status, &mut actions);
            return actions;
        };

        match status {
            Some(StatusCode::Quit) => {
                tracing::debug!("Server closed the session");
                actions.push(Action::Notify(Notification::Disconnected));
                actions.push(Action::Close);
                return actions;
            }
            Some(code @ (StatusCode::ServerDown | StatusCode::Shutdown)) => {
                let err = Error::ServerDown {
                    server: self.server.clone(),
                    code: code.code(),
                };
                tracing::debug!(command = %command.kind, "Server going down");
                report(err, &mut actions);
                return actions;
            }
            Some(code) => {
                if let Some(err) = self.command_error(code, &command) {
                    tracing::debug!(command = %command.kind, error = %err, "Command failed");
                    report(err, &mut actions);
                    command.state = CommandState::Finished;
                }
            }
            None => {}
        }

        if status == Some(StatusCode::Ok) || command.state == CommandState::Finished {
            self.complete(command, &mut actions);
            return actions;
        }

        tracing::trace!(command = %command.kind, state = %command.state, "Checking command");

        match command.kind {
            CommandKind::Client | CommandKind::Quit => {}
            CommandKind::ShowDatabases => {
                self.parse_listing(&mut command, line, status, StatusCode::DatabasesPresent, &mut actions)
            }
            CommandKind::ShowStrategies => {
                self.parse_listing(&mut command, line, status, StatusCode::StrategiesPresent, &mut actions)
            }
            CommandKind::Match => {
                self.parse_listing(&mut command, line, status, StatusCode::MatchesFound, &mut actions)
            }
            CommandKind::Define => self.parse_define(&mut command, line, status, &mut actions),
        }

        self.command = Some(command);
        actions
    }

    /// Lines received before any command was sent
    fn handle_greeting(&mut self, line: &str, status: Option<StatusCode>, actions: &mut Vec<Action>) {
        match status {
            Some(StatusCode::Connect) => {
                tracing::debug!(server = %self.server, "Server accepted the connection");
                actions.push(Action::Notify(Notification::Connected));
                // CLIENT goes out ahead of anything already queued
                self.start(Command::client(), actions);
            }
            Some(code @ (StatusCode::ServerDown | StatusCode::Shutdown)) => {
                let err = Error::ServerDown {
                    server: self.server.clone(),
                    code: code.code(),
                };
                report(err, actions);
            }
            _ => {
                tracing::warn!(line, "Unexpected line without an active command");
                report(Error::Parse(line.to_string()), actions);
            }
        }
    }

    /// Error statuses that end the active command
    fn command_error(&self, code: StatusCode, command: &Command) -> Option<Error> {
        let keyword = command.kind.keyword().to_string();
        let err = match code {
            StatusCode::NoMatch => Error::NoMatch(command.word.clone().unwrap_or_default()),
            StatusCode::BadDatabase => {
                Error::InvalidDatabase(command.database.clone().unwrap_or_default())
            }
            StatusCode::BadStrategy => {
                Error::InvalidStrategy(command.strategy.clone().unwrap_or_default())
            }
            StatusCode::BadCommand | StatusCode::CommandNotImplemented => {
                Error::InvalidCommand(keyword)
            }
            StatusCode::BadParameters | StatusCode::ParameterNotImplemented => {
                Error::InvalidParameters(keyword)
            }
            StatusCode::NoDatabasesPresent => Error::NoDatabases(self.server.clone()),
            StatusCode::NoStrategiesPresent => Error::NoStrategies(self.server.clone()),
            StatusCode::NoAccess | StatusCode::UseShowInfo | StatusCode::UnknownMechanism => {
                Error::AccessDenied {
                    command: keyword,
                    code: code.code(),
                }
            }
            _ => return None,
        };
        Some(err)
    }

    /// Retire `finished` and send whatever comes next
    fn complete(&mut self, finished: Command, actions: &mut Vec<Action>) {
        tracing::debug!(command = %finished.kind, "Command complete");

        if !finished.kind.is_internal() {
            actions.push(Action::Notify(Notification::LookupEnd));
        }

        if finished.kind == CommandKind::Quit {
            // QUIT answered with something other than 221
            actions.push(Action::Notify(Notification::Disconnected));
            actions.push(Action::Close);
            return;
        }

        let next = self.queue.pop().unwrap_or_else(|| {
            tracing::debug!("Queue drained, quitting");
            Command::quit()
        });
        self.start(next, actions);
    }

    fn start(&mut self, command: Command, actions: &mut Vec<Action>) {
        tracing::debug!(
            command = %command.kind,
            database = command.database.as_deref().unwrap_or("<none>"),
            strategy = command.strategy.as_deref().unwrap_or("<none>"),
            word = command.word.as_deref().unwrap_or("<none>"),
            "Sending command"
        );
        actions.push(Action::Send(command.to_line(&self.client_name)));
        self.command = Some(command);
    }

    /// SHOW DB, SHOW STRAT and MATCH replies: `<name> "<text>"` lines
    fn parse_listing(
        &self,
        command: &mut Command,
        line: &str,
        status: Option<StatusCode>,
        announce: StatusCode,
        actions: &mut Vec<Action>,
    ) {
        match status {
            Some(code) if code == announce => {
                tracing::debug!(command = %command.kind, reply = status::status_text(line), "Listing follows");
                command.state = CommandState::AwaitingData;
                actions.push(Action::Notify(Notification::LookupStart));
            }
            Some(code) => unhandled(command, code),
            None if codec::is_terminator(line) => command.state = CommandState::Finished,
            None if command.state == CommandState::AwaitingData => {
                let (name, text) = codec::split_listing(codec::unstuff(line));
                let notification = match command.kind {
                    CommandKind::ShowDatabases => Notification::DatabaseFound(Database {
                        name,
                        full_name: text,
                    }),
                    CommandKind::ShowStrategies => Notification::StrategyFound(Strategy {
                        name,
                        description: text,
                    }),
                    _ => Notification::MatchFound(Match {
                        word: text,
                        database: name,
                    }),
                };
                actions.push(Action::Notify(notification));
            }
            None => ignored(command, line),
        }
    }

    /// DEFINE replies: 150, then (151, body, ".") per definition, then 250
    fn parse_define(
        &self,
        command: &mut Command,
        line: &str,
        status: Option<StatusCode>,
        actions: &mut Vec<Action>,
    ) {
        match status {
            Some(StatusCode::DefinitionsRetrieved) => {
                let total = status::status_text(line)
                    .split_whitespace()
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0);
                tracing::debug!(total, "Definitions follow");

                command.pending = Some(PendingDefinition::new(total));
                command.buffer.clear();
                command.state = CommandState::AwaitingStatus;
                actions.push(Action::Notify(Notification::LookupStart));
            }
            Some(StatusCode::WordDatabaseName) => {
                let mut fields = codec::split_reply_fields(status::status_text(line)).into_iter();
                let pending = command.pending.get_or_insert_with(PendingDefinition::default);
                pending.word = fields.next().unwrap_or_default();
                pending.database_name = fields.next().unwrap_or_default();
                pending.database_full_name = fields.next().unwrap_or_default();

                tracing::debug!(
                    word = %pending.word,
                    db_name = %pending.database_name,
                    db_full = %pending.database_full_name,
                    "Definition header"
                );

                command.buffer.clear();
                command.state = CommandState::AwaitingData;
            }
            Some(code) => unhandled(command, code),
            None if command.state != CommandState::AwaitingData => ignored(command, line),
            None if codec::is_terminator(line) => {
                let pending = command.pending.take().unwrap_or_default();
                let total = pending.total;
                let definition = pending.finish(std::mem::take(&mut command.buffer));
                actions.push(Action::Notify(Notification::DefinitionFound(definition)));

                command.pending = Some(PendingDefinition::new(total));
                command.state = CommandState::AwaitingStatus;
            }
            None => {
                command.buffer.push_str(codec::unstuff(line));
                command.buffer.push('\n');
            }
        }
    }
}

/// Notify `err`, closing the connection when the error invalidates it
fn report(err: Error, actions: &mut Vec<Action>) {
    actions.push(Action::Notify(Notification::error(&err)));
    if err.is_fatal() {
        actions.push(Action::Close);
    }
}

fn unhandled(command: &Command, code: StatusCode) {
    tracing::debug!(command = %command.kind, status = %code, "No handler for status");
}

fn ignored(command: &Command, line: &str) {
    tracing::warn!(command = %command.kind, state = %command.state, line, "Ignoring unexpected line");
}
