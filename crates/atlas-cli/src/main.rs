//! Atlas CLI - grounded answers about places, eras and rulers from your PDFs

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Atlas - Ask questions about your historical PDF collection
#[derive(Parser)]
#[command(name = "atlas")]
#[command(author = "Lalo Morales <lalomorales22@github.com>")]
#[command(version)]
#[command(about = "Ask questions about your historical PDF collection", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(short, long, global = true, env = "ATLAS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Atlas (create config and database)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Convert, split, embed and store the PDF collection
    Ingest {
        /// Directory to scan (default: ingest.pdf_dir)
        #[arg(short, long)]
        dir: Option<String>,

        /// Split unit: sentence, paragraph, word, page
        #[arg(long)]
        split_by: Option<String>,

        /// Units per chunk
        #[arg(long)]
        split_length: Option<usize>,

        /// Units shared between consecutive chunks
        #[arg(long)]
        split_overlap: Option<usize>,

        /// Delete all stored documents first
        #[arg(long)]
        reset: bool,

        /// Write the indexed documents to the output directory afterwards
        #[arg(long)]
        dump: bool,
    },

    /// Show the chunks most similar to a query
    Retrieve {
        /// Search query
        query: String,

        /// Number of documents to return (default: retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Run retrieval for every line of a questions file and write the results
    BatchRetrieve {
        /// File with one question per line
        file: PathBuf,

        /// Number of documents per query (default: retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Ask a single question
    Ask {
        /// Your question
        question: String,

        /// Chat session to read and extend
        #[arg(short, long, default_value = atlas_core::DEFAULT_SESSION)]
        session: String,
    },

    /// Start an interactive chat
    Chat {
        /// Chat session to read and extend
        #[arg(short, long, default_value = atlas_core::DEFAULT_SESSION)]
        session: String,
    },

    /// Show or clear chat history
    History {
        /// Session to show (lists all sessions when omitted)
        #[arg(short, long)]
        session: Option<String>,

        /// Delete the session's history
        #[arg(long, requires = "session")]
        clear: bool,
    },

    /// Show database statistics
    Stats,

    /// Start the HTTP API
    Serve {
        /// Address to bind (default: server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (default: server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., llm.model)
        key: String,

        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("atlas=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("atlas=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => commands::init::run(config_path),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(config_path),
            ConfigCommands::Path => commands::config::path(config_path),
            ConfigCommands::Set { key, value } => commands::config::set(config_path, &key, &value),
        },
        Commands::Ingest {
            dir,
            split_by,
            split_length,
            split_overlap,
            reset,
            dump,
        } => commands::ingest::run(
            config_path,
            commands::ingest::IngestArgs {
                dir,
                split_by,
                split_length,
                split_overlap,
                reset,
                dump,
            },
        ),
        Commands::Retrieve { query, top_k } => commands::retrieve::run(config_path, &query, top_k),
        Commands::BatchRetrieve { file, top_k } => {
            commands::retrieve::run_batch(config_path, &file, top_k)
        }
        Commands::Ask { question, session } => commands::ask::run(config_path, &question, &session),
        Commands::Chat { session } => commands::chat::run(config_path, &session),
        Commands::History { session, clear } => commands::history::run(config_path, session, clear),
        Commands::Stats => commands::stats::run(config_path),
        Commands::Serve { host, port } => commands::serve::run(config_path, host, port),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
