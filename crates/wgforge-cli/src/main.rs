//! wgforge CLI binary entrypoint.
//!
//! This is the main entry point for the `wgforge` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wgforge::FileStore;
use wgforge_cli::cli::{Cli, Commands};
use wgforge_cli::commands::{
    AddPeerCommand, ApplyCommand, InitCommand, KeygenCommand, RemovePeerCommand, ShowCommand,
    TeardownCommand,
};
use wgforge_cli::error::CliError;
use wgforge_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments; clap exits 2 on usage errors.
    let cli = Cli::parse();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);
    let store = FileStore::new(&cli.config, cli.active_path());
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Keygen => KeygenCommand::keypair(&mut stdout, &format),
        Commands::Genpsk => KeygenCommand::preshared(&mut stdout, &format),
        Commands::Init(args) => {
            InitCommand::new(store)
                .execute(&mut stdout, &format, &args)
                .await
        }
        Commands::AddPeer(args) => {
            AddPeerCommand::new(store)
                .execute(&mut stdout, &format, &args)
                .await
        }
        Commands::RemovePeer { public_key } => {
            RemovePeerCommand::new(store)
                .execute(&mut stdout, &format, &public_key)
                .await
        }
        Commands::Apply => ApplyCommand::new(store).execute(&mut stdout, &format).await,
        Commands::Teardown => {
            TeardownCommand::new(store)
                .execute(&mut stdout, &format)
                .await
        }
        Commands::Show => ShowCommand::new(store).execute(&mut stdout, &format).await,
    }
}
