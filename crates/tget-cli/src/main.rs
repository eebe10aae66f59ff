//! tget: get a URL and verify the contents with an asset transparency log
//!
//! tget is similar to other popular URL fetchers with an additional layer
//! of security. By using a transparency log that enables third-party
//! auditing, tget gives you strong guarantees that the cryptographic hash
//! digest of the file you are downloading appears in a public log.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tget_cli::commands;
use tget_cli::config::Config;

#[derive(Parser)]
#[command(
    name = "tget",
    version,
    about = "Get a URL and verify the contents with an asset transparency log"
)]
struct Cli {
    /// Config file (default is the platform config dir's config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download a URL to a local file and verify the contents with the log
    Get { url: String },
    /// Print the contents of a URL only if the log verifies them
    Cat { url: String },
    /// Verify a locally downloaded file against the log
    Verify { url: String, file: PathBuf },
    /// Print version and build information
    Version,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Version => {
            commands::version::run();
            return;
        }
        Command::Get { url } => {
            Config::load(cli.config.as_deref()).and_then(|config| commands::get::run(&config, url))
        }
        Command::Cat { url } => {
            Config::load(cli.config.as_deref()).and_then(|config| commands::cat::run(&config, url))
        }
        Command::Verify { url, file } => Config::load(cli.config.as_deref())
            .and_then(|config| commands::verify::run(&config, url, file)),
    };

    if let Err(err) = result {
        // Verification failures must never read like ordinary fetch errors.
        if is_security_violation(&err) {
            eprintln!("tget: SECURITY ERROR: {err:#}");
        } else {
            eprintln!("tget: {err:#}");
        }
        process::exit(1);
    }
}

fn is_security_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<tget_tlog::Error>()
            .is_some_and(|e| e.is_security_violation())
    })
}
