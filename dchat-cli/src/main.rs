//! dchat CLI: send messages, print the inbox, dump a thread, watch the
//! unread badge. Config from env and optional CLI args.

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::CliConfig;
use messaging::MessagingSession;
use std::sync::Arc;
use std::time::Duration;
use storage::SqliteMessageStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = CliConfig::from_env(cli.user)?;

    dchat_core::logger::init_tracing(config.log_file.as_deref())?;

    let store = SqliteMessageStore::new(&config.database_url)
        .await
        .with_context(|| format!("Failed to open message database: {}", config.database_url))?;
    let session = MessagingSession::sign_in(Arc::new(store), config.user_id.clone())
        .await
        .context("Failed to sign in")?;

    match cli.command {
        Commands::Send { to, message } => handle_send(&session, &to, &message).await?,
        Commands::Inbox { json } => handle_inbox(&session, json).await?,
        Commands::Thread { counterpart } => handle_thread(&session, &counterpart).await?,
        Commands::Watch => handle_watch(&session).await?,
    }

    session.sign_out().await;
    Ok(())
}

async fn handle_send(session: &MessagingSession, to: &str, message: &str) -> Result<()> {
    let thread = session.open_thread(to).await?;
    let sent = thread.send(message).await.context("Send failed")?;
    println!("sent {} -> {}: {}", sent.id, to, sent.content);
    thread.close().await;
    Ok(())
}

async fn handle_inbox(session: &MessagingSession, json: bool) -> Result<()> {
    let inbox = session.open_inbox().await?;
    let summaries = inbox.summaries().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else if summaries.is_empty() {
        println!("no conversations");
    } else {
        for summary in &summaries {
            let marker = if summary.unread_count > 0 {
                format!(" [{} unread]", summary.unread_count)
            } else {
                String::new()
            };
            println!(
                "{}  {}  {}{}",
                summary.last_message.created_at.format("%Y-%m-%d %H:%M:%S"),
                summary.counterpart_id,
                summary.last_message.content,
                marker
            );
        }
    }

    inbox.close().await;
    Ok(())
}

async fn handle_thread(session: &MessagingSession, counterpart: &str) -> Result<()> {
    let thread = session.open_thread(counterpart).await?;
    for message in thread.messages().await {
        println!(
            "{}  {}: {}",
            message.created_at.format("%Y-%m-%d %H:%M:%S"),
            message.sender_id,
            message.content
        );
    }
    thread.close().await;
    Ok(())
}

async fn handle_watch(session: &MessagingSession) -> Result<()> {
    let mut last = None;
    loop {
        let count = session.badge_count().await;
        if last != Some(count) {
            println!("unread: {}", session.badge_display().await);
            last = Some(count);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
