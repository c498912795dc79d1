//! CLI command definitions
//!
//! Defines the clap commands for the dict CLI.

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up the definitions of a word
    #[command(alias = "d")]
    Define {
        /// Word to define
        word: String,

        /// Database to search ("!" searches all, "*" all until a match)
        #[arg(long, short)]
        database: Option<String>,
    },

    /// Find words matching a pattern
    #[command(alias = "m")]
    Match {
        /// Word or pattern to match
        word: String,

        /// Database to search
        #[arg(long, short)]
        database: Option<String>,

        /// Matching strategy ("." uses the server default)
        #[arg(long, short)]
        strategy: Option<String>,
    },

    /// List the databases offered by the server
    #[command(alias = "dbs")]
    Databases,

    /// List the matching strategies offered by the server
    #[command(alias = "strats")]
    Strategies,
}
