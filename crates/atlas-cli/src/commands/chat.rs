//! Chat command - interactive question answering with session history.

use super::{print_response, runtime, AppContext};
use anyhow::{Context, Result};
use atlas_rag::QueryEngine;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;

const SOURCES_SHOWN: usize = 3;

/// What the REPL should do with one input line.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Exit,
    Empty,
    Clear,
    History,
    Help,
    Question(&'a str),
}

fn classify(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "exit" | "quit" => ChatInput::Exit,
        "" => ChatInput::Empty,
        "/clear" => ChatInput::Clear,
        "/history" => ChatInput::History,
        "/help" | "help" => ChatInput::Help,
        _ => ChatInput::Question(line),
    }
}

pub fn run(config_path: Option<&Path>, session: &str) -> Result<()> {
    let ctx = AppContext::load(config_path)?;
    let db = ctx.database()?;
    let engine = QueryEngine::from_config(&ctx.config, db).context("Failed to set up the query engine")?;
    let rt = runtime()?;

    let mut rl = DefaultEditor::new()?;
    let history_path = &ctx.paths.repl_history_file;
    let _ = rl.load_history(history_path);

    println!("{}", "Atlas Chat".cyan().bold());
    println!("{}", "─".repeat(50));
    println!(
        "Session {}. Type {} for commands, {} to leave.",
        session.yellow(),
        "/help".cyan(),
        "exit".cyan()
    );
    println!();

    loop {
        let readline = rl.readline(&format!("{} ", "you>".green().bold()));
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red(), err);
                break;
            }
        };

        match classify(&line) {
            ChatInput::Exit => break,
            ChatInput::Empty => println!("{}", "Please enter a non-empty question.".yellow()),
            ChatInput::Help => print_help(),
            ChatInput::Clear => match engine.clear_history(session) {
                Ok(deleted) => println!("{} {} messages", "Cleared:".green(), deleted),
                Err(e) => eprintln!("{} {}", "Error:".red(), e),
            },
            ChatInput::History => {
                if let Err(e) = super::history::print_session(engine.db(), session) {
                    eprintln!("{} {}", "Error:".red(), e);
                }
            }
            ChatInput::Question(question) => {
                let _ = rl.add_history_entry(question);
                match rt.block_on(engine.query(session, question)) {
                    Ok(response) => {
                        println!();
                        print_response(&response, SOURCES_SHOWN);
                    }
                    Err(e) => eprintln!("{} {}", "Error:".red(), e),
                }
            }
        }
    }

    println!("Goodbye!");

    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(history_path);

    Ok(())
}

fn print_help() {
    println!("{}", "Available Commands:".cyan().bold());
    println!();
    println!("  {}       Ask about the indexed documents", "<question>".white());
    println!("  {}         Show this session's history", "/history".white());
    println!("  {}           Clear this session's history", "/clear".white());
    println!("  {}        Leave the chat", "exit, quit".white());
    println!();
}
