//! Command line interface.

use clap::{Parser, Subcommand};

/// Telegram bot for personal budgeting with a web mini-app backend
#[derive(Parser)]
#[command(name = "kopilka")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot together with the web mini-app API server (default)
    Run {
        /// Port for the web mini-app REST API, overrides WEBAPP_PORT
        #[arg(long)]
        webapp_port: Option<u16>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
