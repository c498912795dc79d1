//! CLI command handling
//!
//! Runs one lookup against the configured server and formats the
//! notifications it produces.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::client::ClientContext;
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::protocol::Notification;

/// Options shared by every subcommand
#[derive(Debug, Default, Clone)]
pub struct GlobalOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub json: bool,
    pub config: Option<PathBuf>,
}

/// Dispatch a CLI command
///
/// Returns `Ok(false)` when the server reported an error.
pub async fn dispatch(options: GlobalOptions, command: Commands) -> Result<bool> {
    let mut config = match &options.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(host) = options.host {
        config.server.hostname = host;
    }
    if let Some(port) = options.port {
        config.server.port = port;
    }

    let mut context = ClientContext::new(&config);
    let notifications = context
        .take_notifications()
        .ok_or_else(|| Error::Internal("notification receiver already taken".to_string()))?;
    let printer = tokio::spawn(print_notifications(notifications, options.json));

    match command {
        Commands::Define { word, database } => {
            context.define_word(database.as_deref(), &word).await?
        }
        Commands::Match {
            word,
            database,
            strategy,
        } => {
            context
                .match_word(database.as_deref(), strategy.as_deref(), &word)
                .await?
        }
        Commands::Databases => context.lookup_databases().await?,
        Commands::Strategies => context.lookup_strategies().await?,
    }

    context.run().await;

    // Dropping the context closes the channel and lets the printer finish
    drop(context);
    printer
        .await
        .map_err(|e| Error::Internal(format!("output task failed: {}", e)))
}

/// Print notifications until the channel closes; returns whether no error was seen
async fn print_notifications(mut rx: mpsc::UnboundedReceiver<Notification>, json: bool) -> bool {
    let mut ok = true;

    while let Some(notification) = rx.recv().await {
        if let Notification::Error(e) = &notification {
            ok = false;
            if !json {
                eprintln!("Error: {}", e);
            }
        }

        if json {
            match serde_json::to_string(&notification) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize notification"),
            }
            continue;
        }

        if let Some(text) = render_text(&notification) {
            println!("{}", text);
        }
    }

    ok
}

/// Plain-text rendering of result notifications
fn render_text(notification: &Notification) -> Option<String> {
    match notification {
        Notification::DatabaseFound(db) => Some(format!("{:<16} {}", db.name, db.full_name)),
        Notification::StrategyFound(strat) => {
            Some(format!("{:<16} {}", strat.name, strat.description))
        }
        Notification::MatchFound(m) => Some(format!("{}: {}", m.database, m.word)),
        Notification::DefinitionFound(def) => Some(format!(
            "From {} [{}]:\n\n{}",
            def.database_full_name, def.database_name, def.body
        )),
        Notification::Connected
        | Notification::Disconnected
        | Notification::LookupStart
        | Notification::LookupEnd
        | Notification::Error(_) => {
            tracing::debug!(?notification, "Lifecycle notification");
            None
        }
    }
}
