//! rootsync CLI
//!
//! Command-line front end for a rootsync backend.
//!
//! # Commands
//!
//! - `root` - Show the current root hash and generation
//! - `write-root` - Compare-and-swap the root pointer
//! - `get` / `put` - Transfer a blob
//! - `url` - Request a signed blob URL
//! - `checksum` - Compute the CRC32C upload header of a file

mod commands;

use clap::{Parser, Subcommand};
use commands::connect::{connect, ConnectOptions};
use commands::url::UrlKind;
use rootsync_protocol::{ContentHash, Generation};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Sync a document tree against a content-addressed blob store.
#[derive(Parser)]
#[command(name = "rootsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the backend
    #[arg(global = true, long, default_value = "http://127.0.0.1:8080/")]
    base_url: String,

    /// JSON file with `devicetoken` and `usertoken`
    #[arg(global = true, long)]
    tokens: Option<PathBuf>,

    /// Device token (overrides --tokens)
    #[arg(global = true, long)]
    device_token: Option<String>,

    /// User token (overrides --tokens)
    #[arg(global = true, long)]
    user_token: Option<String>,

    /// Overall request timeout in seconds
    #[arg(global = true, long, default_value = "300")]
    timeout_secs: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current root hash and generation
    Root {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Point the root at a new hash if the generation is still current
    WriteRoot {
        /// New root hash
        hash: String,

        /// Generation the root is expected to be at
        generation: u64,

        /// Do not ask the backend to notify other devices
        #[arg(long)]
        no_notify: bool,
    },

    /// Download a blob
    Get {
        /// Blob hash
        hash: String,

        /// Name sent with the request
        #[arg(short, long, default_value = "blob")]
        name: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Upload a file as a blob
    Put {
        /// Blob hash
        hash: String,

        /// File to upload
        file: PathBuf,

        /// Name sent with the request (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Request a signed blob URL
    Url {
        /// URL kind
        #[arg(value_enum)]
        kind: UrlKind,

        /// Blob hash
        hash: String,
    },

    /// Compute the CRC32C upload header of a file
    Checksum {
        /// File to checksum
        file: PathBuf,
    },

    /// Show version information
    Version,
}

impl Cli {
    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            base_url: self.base_url.clone(),
            tokens_file: self.tokens.clone(),
            device_token: self.device_token.clone(),
            user_token: self.user_token.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries command output.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Commands::Root { format } => {
            let storage = connect(&cli.connect_options())?;
            commands::root::show(&storage, format, &mut stdout)?;
        }
        Commands::WriteRoot {
            hash,
            generation,
            no_notify,
        } => {
            let storage = connect(&cli.connect_options())?.with_notify(!no_notify);
            commands::root::write(
                &storage,
                &storage,
                &ContentHash::from(hash.as_str()),
                Generation(*generation),
                &mut stdout,
            )?;
        }
        Commands::Get { hash, name, out } => {
            let storage = connect(&cli.connect_options())?;
            commands::blob::get(
                &storage,
                &ContentHash::from(hash.as_str()),
                name,
                out.as_deref(),
                &mut stdout,
            )?;
        }
        Commands::Put { hash, file, name } => {
            let storage = connect(&cli.connect_options())?;
            commands::blob::put(
                &storage,
                &ContentHash::from(hash.as_str()),
                file,
                name.as_deref(),
            )?;
        }
        Commands::Url { kind, hash } => {
            let storage = connect(&cli.connect_options())?;
            commands::url::run(&storage, *kind, &ContentHash::from(hash.as_str()), &mut stdout)?;
        }
        Commands::Checksum { file } => {
            commands::checksum::run(file, &mut stdout)?;
        }
        Commands::Version => {
            println!("rootsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "root index schema v{}",
                rootsync_protocol::SCHEMA_VERSION
            );
        }
    }

    Ok(())
}
