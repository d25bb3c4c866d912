//! Corral command-line client.
//!
//! Usage:
//!   corral create-site --catalog sites.toml abe   - Create (and optionally submit) sites
//!   corral list-sites [-l] [-a] [ID...]           - List sites
//!   corral remove-site ID... [-f]                 - Remove sites
//!   corral create-glidein --site ID --condor-host HOST
//!   corral list-glideins [-l] [-a] [ID...]
//!   corral remove-glidein ID... [-f]
//!   corral site-history ID...                     - State changes of sites
//!   corral glidein-history ID...                  - State changes of glideins

use clap::Parser;
use corral_cli::commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.global.debug { "corral_cli=debug" } else { "corral_cli=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    cli.run().await
}
