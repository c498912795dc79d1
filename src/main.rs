//! dict - a DICT protocol (RFC 2229) client
//!
//! Looks up definitions, matches, databases and strategies on a
//! dictionary server and prints them as text or JSON lines.

use std::path::PathBuf;

use clap::Parser;
use dict::cli::{self, GlobalOptions};
use dict::commands::Commands;
use dict::common::logging;

#[derive(Parser)]
#[command(name = "dict", about = "DICT protocol client")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dictionary server hostname
    #[arg(long, short = 'H', global = true)]
    host: Option<String>,

    /// Dictionary server port
    #[arg(long, short, global = true)]
    port: Option<u16>,

    /// Print every notification as a JSON line
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file to use instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let options = GlobalOptions {
        host: cli.host,
        port: cli.port,
        json: cli.json,
        config: cli.config,
    };

    match cli::dispatch(options, cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
