//! Client context: one connection to one dictionary server
//!
//! Lookup requests connect on demand and queue a command. The context is
//! driven by [`ClientContext::run`], which reads server lines, feeds them
//! to the protocol [`Engine`] and carries out the resulting actions. All
//! results and lifecycle changes are delivered on the notification
//! channel returned by [`ClientContext::take_notifications`].

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::transport::{HostLookup, Resolver, SystemLookup, Transport};
use crate::common::config::{default_client_name, Config, DEFAULT_HOSTNAME, DEFAULT_PORT};
use crate::common::{server_label, Error, Result};
use crate::protocol::{Action, Command, CommandKind, Engine, Notification, StatusCode};

/// Connection to a DICT server and the lookups running on it
pub struct ClientContext<L: HostLookup = SystemLookup> {
    hostname: String,
    port: u16,
    client_name: String,
    /// Database used when a request does not name one
    default_database: String,
    /// Strategy used when a request does not name one
    default_strategy: String,
    /// Budget for connecting and receiving the greeting
    connect_timeout: std::time::Duration,
    /// Log every exchanged line at info level
    wire_debug: bool,
    resolver: Resolver<L>,
    engine: Engine,
    transport: Option<Transport>,
    /// Set while waiting for the server greeting
    connect_deadline: Option<Instant>,
    /// Channel for notifications
    notify_tx: mpsc::UnboundedSender<Notification>,
    /// Receiver for notifications (given to the consumer)
    notify_rx: Option<mpsc::UnboundedReceiver<Notification>>,
}

impl ClientContext<SystemLookup> {
    /// Create a context resolving hosts through the operating system
    pub fn new(config: &Config) -> Self {
        Self::with_lookup(config, SystemLookup)
    }
}

impl<L: HostLookup> ClientContext<L> {
    /// Create a context with a custom name resolution backend
    pub fn with_lookup(config: &Config, lookup: L) -> Self {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let hostname = config.server.hostname.clone();
        let port = config.server.port;
        let client_name = config.server.client_name.clone();

        Self {
            engine: Engine::new(server_label(&hostname, port), client_name.clone()),
            hostname,
            port,
            client_name,
            default_database: config.defaults.database.clone(),
            default_strategy: config.defaults.strategy.clone(),
            connect_timeout: config.timeouts.connect(),
            wire_debug: config.debug.wire,
            resolver: Resolver::new(
                lookup,
                config.timeouts.lookup_cache(),
                config.server.prefer_ipv6,
            ),
            transport: None,
            connect_deadline: None,
            notify_tx,
            notify_rx: Some(notify_rx),
        }
    }

    /// Take the notification receiver (can only be called once)
    pub fn take_notifications(&mut self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.notify_rx.take()
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Set the server hostname; `None` restores the default
    ///
    /// Takes effect on the next connection.
    pub fn set_hostname(&mut self, hostname: Option<&str>) {
        self.hostname = hostname.unwrap_or(DEFAULT_HOSTNAME).to_string();
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Set the server port; `None` restores the default
    ///
    /// Takes effect on the next connection.
    pub fn set_port(&mut self, port: Option<u16>) {
        self.port = port.unwrap_or(DEFAULT_PORT);
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Set the name sent with CLIENT; `None` restores the default
    pub fn set_client_name(&mut self, name: Option<&str>) {
        self.client_name = name.map(str::to_string).unwrap_or_else(default_client_name);
    }

    /// Last status accepted from the server
    pub fn status(&self) -> Option<StatusCode> {
        self.engine.status()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Whether the server greeting is still outstanding
    pub fn is_connecting(&self) -> bool {
        self.connect_deadline.is_some()
    }

    /// Commands waiting behind the active one
    pub fn queued(&self) -> usize {
        self.engine.queued()
    }

    /// Kind of the command awaiting its reply
    pub fn active_command(&self) -> Option<CommandKind> {
        self.engine.active_command().map(|c| c.kind)
    }

    /// List the databases offered by the server
    pub async fn lookup_databases(&mut self) -> Result<()> {
        self.submit(Command::show_databases()).await
    }

    /// List the matching strategies offered by the server
    pub async fn lookup_strategies(&mut self) -> Result<()> {
        self.submit(Command::show_strategies()).await
    }

    /// Find words matching `word` with `strategy` in `database`
    pub async fn match_word(
        &mut self,
        database: Option<&str>,
        strategy: Option<&str>,
        word: &str,
    ) -> Result<()> {
        if word.is_empty() {
            return Err(Error::InvalidParameters(CommandKind::Match.keyword().to_string()));
        }
        let command = Command::match_word(
            Some(database.unwrap_or(&self.default_database)),
            Some(strategy.unwrap_or(&self.default_strategy)),
            word,
        );
        self.submit(command).await
    }

    /// Retrieve the definitions of `word` from `database`
    pub async fn define_word(&mut self, database: Option<&str>, word: &str) -> Result<()> {
        if word.is_empty() {
            return Err(Error::InvalidParameters(CommandKind::Define.keyword().to_string()));
        }
        let command = Command::define_word(Some(database.unwrap_or(&self.default_database)), word);
        self.submit(command).await
    }

    /// Drop the connection, discarding every pending command
    ///
    /// Does nothing when there is neither a connection nor a pending command.
    pub async fn disconnect(&mut self) {
        let pending = self.engine.active_command().is_some() || self.engine.queued() > 0;
        let transport = self.transport.take();
        if transport.is_none() && !pending {
            return;
        }

        if let Some(mut transport) = transport {
            if let Err(e) = transport.shutdown().await {
                tracing::debug!(error = %e, "Error shutting down connection");
            }
        }
        self.close();
        self.notify(Notification::Disconnected);
    }

    /// Process server lines until the connection closes
    pub async fn run(&mut self) {
        while self.step().await {}
    }

    /// Read and process one server line
    ///
    /// Returns `false` when there is no connection left to read from.
    pub async fn step(&mut self) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        let read = match self.connect_deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, transport.read_line()).await,
            None => Ok(transport.read_line().await),
        };
        let Ok(read) = read else {
            let err = Error::ConnectionTimeout(self.server());
            self.fail(err);
            return false;
        };
        self.connect_deadline = None;

        match read {
            Ok(Some(line)) => self.handle_line(&line).await,
            Ok(None) if self.engine.is_quitting() => {
                tracing::debug!("Server closed the connection after QUIT");
                self.close();
                self.notify(Notification::Disconnected);
            }
            Ok(None) => {
                let err = Error::socket(&self.server(), "Connection closed by the dictionary server");
                self.fail(err);
            }
            Err(e) => self.fail(e),
        }

        self.transport.is_some()
    }

    async fn submit(&mut self, command: Command) -> Result<()> {
        self.ensure_connected().await?;

        let kind = command.kind;
        if !self.engine.enqueue(command) {
            return Err(Error::Internal(format!("{} command queued twice", kind)));
        }
        Ok(())
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.transport.is_some() {
            if !self.engine.is_quitting() {
                return Ok(());
            }
            // QUIT is already on its way; start over on a fresh connection
            tracing::debug!("Connection is closing, reconnecting");
            self.close();
            self.notify(Notification::Disconnected);
        }
        self.connect().await
    }

    async fn connect(&mut self) -> Result<()> {
        if self.hostname.trim().is_empty() {
            return Err(Error::NoHostname);
        }

        let server = self.server();
        let deadline = Instant::now() + self.connect_timeout;

        let address = self.resolver.resolve(&self.hostname).await?;
        let transport = Transport::connect(SocketAddr::new(address, self.port), &server, deadline).await?;

        tracing::debug!(server = %server, %address, "Connected, waiting for greeting");
        self.engine = Engine::new(server, self.client_name.clone());
        self.transport = Some(transport);
        self.connect_deadline = Some(deadline);
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) {
        if self.wire_debug {
            tracing::info!("DICT <<< {}", line);
        } else {
            tracing::trace!("DICT <<< {}", line);
        }

        for action in self.engine.handle_line(line) {
            match action {
                Action::Notify(notification) => self.notify(notification),
                Action::Send(text) => {
                    if let Err(e) = self.send(&text).await {
                        self.fail(e);
                        return;
                    }
                }
                Action::Close => {
                    self.close();
                    return;
                }
            }
        }
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| Error::NoConnection(server_label(&self.hostname, self.port)))?;

        if self.wire_debug {
            tracing::info!("DICT >>> {}", line);
        } else {
            tracing::trace!("DICT >>> {}", line);
        }

        transport.send_line(line).await
    }

    /// Report `err` and drop the connection
    fn fail(&mut self, err: Error) {
        tracing::debug!(error = %err, "Connection failed");
        self.notify(Notification::error(&err));
        self.close();
    }

    fn close(&mut self) {
        self.transport = None;
        self.connect_deadline = None;
        self.engine.reset();
    }

    fn notify(&self, notification: Notification) {
        // The consumer may have dropped its receiver
        let _ = self.notify_tx.send(notification);
    }

    fn server(&self) -> String {
        server_label(&self.hostname, self.port)
    }
}
