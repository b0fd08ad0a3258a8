//! History command - show or clear chat sessions.

use super::{preview, AppContext};
use anyhow::Result;
use atlas_core::Role;
use atlas_db::Database;
use colored::Colorize;
use std::path::Path;

pub fn run(config_path: Option<&Path>, session: Option<String>, clear: bool) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let db = ctx.database()?;

    match session {
        Some(session) if clear => {
            let deleted = db.clear_history(&session)?;
            println!(
                "{} {} messages from session {}",
                "Deleted:".green().bold(),
                deleted,
                session.yellow()
            );
            Ok(())
        }
        Some(session) => print_session(&db, &session),
        None => list_sessions(&db),
    }
}

/// Print every message of `session`, oldest first.
pub fn print_session(db: &Database, session: &str) -> Result<()> {
    let messages = db.list_messages(session)?;

    if messages.is_empty() {
        println!("{}", format!("No history for session {}.", session).dimmed());
        return Ok(());
    }

    println!("{} {}", "Session".cyan().bold(), session.yellow());
    println!("{}", "─".repeat(70));

    for message in &messages {
        let time = message.timestamp.format("%Y-%m-%d %H:%M");
        let speaker = match message.role {
            Role::User => "You".green().bold(),
            Role::Assistant => "Atlas".cyan().bold(),
        };
        println!("{} {}", time.to_string().dimmed(), speaker);
        println!("  {}", preview(&message.content, 300));
    }

    Ok(())
}

fn list_sessions(db: &Database) -> Result<()> {
    let sessions = db.list_sessions()?;

    if sessions.is_empty() {
        println!("{}", "No chat history yet.".dimmed());
        return Ok(());
    }

    println!("{}", "Sessions".cyan().bold());
    println!("{}", "─".repeat(50));
    for summary in &sessions {
        let last = summary
            .last_activity
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:>5} messages   {}",
            summary.session.yellow(),
            summary.message_count,
            last.dimmed()
        );
    }

    Ok(())
}
