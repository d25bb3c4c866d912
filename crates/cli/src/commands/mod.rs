//! Command-line definitions and dispatch.

pub mod glidein;
pub mod site;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use corral_core::credential::Credential;
use corral_core::types::DbId;

use crate::client::{ListQuery, ServiceClient};
use crate::credential::{self, DEFAULT_LIFETIME_HOURS};

#[derive(Debug, Parser)]
#[command(name = "corral")]
#[command(about = "Provision Condor glideins on grid sites")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Service host
    #[arg(long, global = true, env = "CORRAL_HOST", default_value = "localhost")]
    pub host: String,

    /// Service port
    #[arg(long, global = true, env = "CORRAL_PORT", default_value_t = 8443)]
    pub port: u16,

    /// Certificate subject (DN) to identify as
    #[arg(long, global = true, env = "CORRAL_SUBJECT")]
    pub subject: Option<String>,

    /// Print debugging output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

impl GlobalArgs {
    pub fn client(&self) -> ServiceClient {
        ServiceClient::new(format!("http://{}:{}", self.host, self.port), self.subject.clone())
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add sites from a site catalog
    #[command(visible_alias = "cs")]
    CreateSite(site::CreateSiteArgs),
    /// List sites
    #[command(visible_alias = "ls")]
    ListSites(ListArgs),
    /// Remove sites
    #[command(visible_alias = "rs")]
    RemoveSite(site::RemoveSiteArgs),
    /// Show the state history of sites
    #[command(visible_alias = "sh")]
    SiteHistory(HistoryArgs),
    /// Create and submit a glidein
    #[command(visible_alias = "cg")]
    CreateGlidein(glidein::CreateGlideinArgs),
    /// List glideins
    #[command(visible_alias = "lg")]
    ListGlideins(ListArgs),
    /// Remove glideins
    #[command(visible_alias = "rg")]
    RemoveGlidein(glidein::RemoveGlideinArgs),
    /// Show the state history of glideins
    #[command(visible_alias = "gh")]
    GlideinHistory(HistoryArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let client = self.global.client();
        match self.command {
            Command::CreateSite(args) => site::create(&client, args).await,
            Command::ListSites(args) => site::list(&client, args).await,
            Command::RemoveSite(args) => site::remove(&client, args).await,
            Command::SiteHistory(args) => site::history(&client, args).await,
            Command::CreateGlidein(args) => glidein::create(&client, args).await,
            Command::ListGlideins(args) => glidein::list(&client, args).await,
            Command::RemoveGlidein(args) => glidein::remove(&client, args).await,
            Command::GlideinHistory(args) => glidein::history(&client, args).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Show detailed information
    #[arg(short, long)]
    pub long: bool,

    /// Show resources for all users
    #[arg(short, long, conflicts_with = "user")]
    pub all: bool,

    /// Show resources for this user (default: current user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Only these ids
    #[arg(value_parser = clap::value_parser!(i64).range(1..))]
    pub ids: Vec<DbId>,
}

impl ListArgs {
    pub fn query(&self) -> ListQuery {
        ListQuery {
            user: self.user.clone(),
            all: self.all,
        }
    }
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(required = true, value_parser = clap::value_parser!(i64).range(1..))]
    pub ids: Vec<DbId>,
}

#[derive(Debug, Args)]
pub struct CredentialArgs {
    /// Proxy credential file to delegate
    #[arg(short = 'C', long, env = "X509_USER_PROXY")]
    pub credential: Option<PathBuf>,

    /// Hours the delegated credential stays valid
    #[arg(long, default_value_t = DEFAULT_LIFETIME_HOURS)]
    pub credential_lifetime: i64,
}

impl CredentialArgs {
    pub fn load(&self) -> anyhow::Result<Credential> {
        let path = self
            .credential
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Missing credential: use --credential or set X509_USER_PROXY"))?;
        credential::load(path, self.credential_lifetime)
    }
}

/// Report per-id failures and fail the command if any occurred.
pub(crate) fn summarize(what: &str, failures: usize) -> anyhow::Result<()> {
    if failures > 0 {
        anyhow::bail!("Unable to {what} {failures} resource(s)");
    }
    Ok(())
}
