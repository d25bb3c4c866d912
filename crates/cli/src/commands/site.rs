//! `create-site`, `list-sites` and `remove-site`.

use std::path::PathBuf;

use chrono::Local;
use clap::Args;
use corral_core::types::DbId;

use super::{summarize, CredentialArgs, HistoryArgs, ListArgs};
use crate::catalog::Catalog;
use crate::client::ServiceClient;
use crate::output;

#[derive(Debug, Args)]
pub struct CreateSiteArgs {
    /// TOML site catalog
    #[arg(short, long)]
    pub catalog: PathBuf,

    /// Sites to create (default: every site in the catalog)
    pub names: Vec<String>,

    /// Submit each site after creating it
    #[arg(short, long)]
    pub submit: bool,

    #[command(flatten)]
    pub credential: CredentialArgs,
}

#[derive(Debug, Args)]
pub struct RemoveSiteArgs {
    #[arg(required = true, value_parser = clap::value_parser!(i64).range(1..))]
    pub ids: Vec<DbId>,

    /// Delete the site without running the uninstall job
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub credential: CredentialArgs,
}

pub async fn create(client: &ServiceClient, args: CreateSiteArgs) -> anyhow::Result<()> {
    let catalog = Catalog::load(&args.catalog)?;
    let names = if args.names.is_empty() {
        catalog.site_names()
    } else {
        args.names
    };

    // Build every request first so a bad catalog entry creates nothing.
    let sites = names
        .iter()
        .map(|name| catalog.site(name))
        .collect::<Result<Vec<_>, _>>()?;
    let credential = if args.submit {
        Some(args.credential.load()?)
    } else {
        None
    };

    for site in &sites {
        let name = site.name.as_deref().unwrap_or_default();
        tracing::debug!(name, "Creating site");
        let id = client
            .create_site(site)
            .await
            .map_err(|e| anyhow::anyhow!("Unable to create site: {name}: {e}"))?;
        println!("Created site {name} ({id})");

        if let Some(credential) = &credential {
            client
                .submit_site(id, credential)
                .await
                .map_err(|e| anyhow::anyhow!("Unable to submit site: {name}: {e}"))?;
            tracing::debug!(id, "Submitted site");
        }
    }
    Ok(())
}

pub async fn list(client: &ServiceClient, args: ListArgs) -> anyhow::Result<()> {
    let sites = if args.ids.is_empty() {
        client
            .list_sites(&args.query())
            .await
            .map_err(|e| anyhow::anyhow!("Unable to list sites: {e}"))?
    } else {
        let mut sites = Vec::with_capacity(args.ids.len());
        for id in &args.ids {
            match client.get_site(*id).await {
                Ok(site) => sites.push(site),
                Err(e) => println!("{e}"),
            }
        }
        sites
    };

    if sites.is_empty() {
        tracing::debug!("No sites");
        return Ok(());
    }

    if args.long {
        for site in &sites {
            println!("{}", output::site_long(site, &Local));
        }
    } else {
        print!("{}", output::sites_short(&sites, &Local));
    }
    Ok(())
}

pub async fn remove(client: &ServiceClient, args: RemoveSiteArgs) -> anyhow::Result<()> {
    let credential = if args.force {
        None
    } else {
        Some(args.credential.load()?)
    };

    let mut failures = 0;
    for id in &args.ids {
        tracing::debug!(id, force = args.force, "Removing site");
        if let Err(e) = client.remove_site(*id, args.force, credential.as_ref()).await {
            eprintln!("Unable to remove site {id}: {e}");
            failures += 1;
        }
    }
    summarize("remove", failures)
}

pub async fn history(client: &ServiceClient, args: HistoryArgs) -> anyhow::Result<()> {
    let mut failures = 0;
    for id in &args.ids {
        match client.site_history(*id).await {
            Ok(entries) => print!("{}", output::history(&entries, &Local)),
            Err(e) => {
                eprintln!("Unable to get history of site {id}: {e}");
                failures += 1;
            }
        }
    }
    summarize("get history of", failures)
}
