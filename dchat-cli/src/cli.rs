//! Command-line definition for the dchat binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dchat")]
#[command(about = "Direct-messaging CLI: send, inbox, thread, watch", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Acting user id (overrides DCHAT_USER).
    #[arg(short, long)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a message to another user.
    Send {
        /// Receiver user id.
        #[arg(short, long)]
        to: String,
        /// Message text.
        message: String,
    },
    /// Print the inbox: one line per conversation, most recent first.
    Inbox {
        /// Emit summaries as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print the full thread with one counterpart and mark it read.
    Thread {
        /// Counterpart user id.
        counterpart: String,
    },
    /// Watch the unread badge, printing on every change.
    Watch,
}
