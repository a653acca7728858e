//! PRD Analyzer - Main Entry Point
//!
//! Command-line front end for the `prd_analyzer` library: runs the REST
//! service, an interactive chat client, and database maintenance commands.

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use prd_analyzer::client::HttpBackend;
use prd_analyzer::config::AppConfig;
use prd_analyzer::formatting;
use prd_analyzer::session::{ChatSession, SendOutcome};
use prd_analyzer::storage::Database;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// PRD Analyzer - turn product ideas into product requirements documents
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides config and environment)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat with a running service and build a PRD interactively
    Chat {
        /// Base URL of the service
        #[arg(long, default_value = "http://localhost:8000")]
        server: String,
        /// Store the exchange under this conversation
        #[arg(long)]
        conversation: Option<i64>,
    },
    /// Create any missing tables
    InitDb,
    /// Drop and recreate every table
    ResetDb {
        /// Confirm that all data should be deleted
        #[arg(long)]
        yes: bool,
    },
    /// Show database location, size and row counts
    DbInfo,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Check if no arguments were provided (except the program name)
    if std::env::args().len() == 1 {
        let mut cmd = Args::command();
        cmd.print_help().ok();
        println!();
        std::process::exit(2);
    }

    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(database) = args.database {
        config.database.path = database;
    }

    match args.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            prd_analyzer::serve(config).await
        }
        Command::Chat {
            server,
            conversation,
        } => chat(&server, conversation).await,
        Command::InitDb => {
            let db = open_database(&config)?;
            db.migrate().context("Failed to create tables")?;
            println!("Database initialized at {}", config.database.path.display());
            Ok(())
        }
        Command::ResetDb { yes } => {
            if !yes {
                bail!("Refusing to reset the database without --yes; all data would be deleted");
            }
            let db = open_database(&config)?;
            db.reset().context("Failed to reset database")?;
            println!("Database reset at {}", config.database.path.display());
            Ok(())
        }
        Command::DbInfo => {
            let db = open_database(&config)?;
            let info = db.info().context("Failed to read database info")?;
            print!("{}", formatting::format_database_info(&info));
            Ok(())
        }
    }
}

fn open_database(config: &AppConfig) -> Result<Database> {
    Database::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))
}

/// Interactive loop: each line is sent as a product message
///
/// `/doc` prints the document, `/export [dir]` writes it as text and `/quit`
/// leaves.
async fn chat(server: &str, conversation: Option<i64>) -> Result<()> {
    let backend = HttpBackend::new(server).context("Failed to build HTTP client")?;
    let mut session = ChatSession::new(backend);
    if let Some(id) = conversation {
        session = session.with_conversation(id);
    }

    let mut shown = 0;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        for message in &session.messages()[shown..] {
            println!("{}\n", formatting::format_message(message));
        }
        shown = session.messages().len();

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("/quit", _) => break,
            ("/doc", _) => println!("{}", formatting::format_document(session.document())),
            ("/export", dir) => {
                let dir = if dir.is_empty() { "." } else { dir };
                match session.write_export(dir.as_ref(), Local::now().date_naive()) {
                    Ok(path) => println!("Exported to {}\n", path.display()),
                    Err(e) => eprintln!("Export failed: {:#}\n", e),
                }
            }
            _ => match session.send(line).await {
                SendOutcome::Updated { appended, .. } => {
                    println!("({} new item(s) in the document)", appended)
                }
                SendOutcome::Ignored
                | SendOutcome::Busy
                | SendOutcome::TooLong
                | SendOutcome::Failed(_)
                | SendOutcome::Unreachable => {}
            },
        }
    }
    Ok(())
}
