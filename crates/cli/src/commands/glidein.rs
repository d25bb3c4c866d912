//! `create-glidein`, `list-glideins` and `remove-glidein`.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::Args;
use corral_core::glidein::{CreateGlidein, MIN_WALL_TIME};
use corral_core::types::DbId;

use super::{summarize, CredentialArgs, HistoryArgs, ListArgs};
use crate::client::ServiceClient;
use crate::output;
use crate::resubmit::Resubmit;

#[derive(Debug, Args)]
pub struct CreateGlideinArgs {
    /// Site to run the glidein on
    #[arg(short, long)]
    pub site: DbId,

    /// Central manager the glidein reports to
    #[arg(long)]
    pub condor_host: String,

    /// Number of processes to start
    #[arg(short, long, default_value_t = 1)]
    pub count: i32,

    /// Number of hosts to spread the processes over
    #[arg(long, default_value_t = 1)]
    pub host_count: i32,

    /// Wall time in minutes
    #[arg(short, long, default_value_t = 60)]
    pub wall_time: i32,

    /// CPUs per process
    #[arg(short, long, default_value_t = 1)]
    pub num_cpus: i32,

    /// Minutes a glidein may sit idle before exiting (default: wall time)
    #[arg(short, long)]
    pub idle_time: Option<i32>,

    /// Condor daemon debug flags
    #[arg(long)]
    pub condor_debug: Option<String>,

    #[arg(long)]
    pub gcb_broker: Option<String>,

    #[arg(long)]
    pub ccb_address: Option<String>,

    /// Custom condor_config for the glidein
    #[arg(long)]
    pub condor_config: Option<PathBuf>,

    /// Extra RSL for the glidein job
    #[arg(long)]
    pub rsl: Option<String>,

    #[arg(long)]
    pub highport: Option<i32>,

    #[arg(long)]
    pub lowport: Option<i32>,

    /// Resubmit when the glidein finishes: forever, N times, or until a
    /// date ("YYYY-MM-DD HH:MM:SS")
    #[arg(short, long, num_args = 0..=1)]
    pub resubmit: Option<Option<String>>,

    #[command(flatten)]
    pub credential: CredentialArgs,
}

#[derive(Debug, Args)]
pub struct RemoveGlideinArgs {
    #[arg(required = true, value_parser = clap::value_parser!(i64).range(1..))]
    pub ids: Vec<DbId>,

    /// Delete the glidein without waiting for its job to be removed
    #[arg(short, long)]
    pub force: bool,
}

impl CreateGlideinArgs {
    /// Build the create request. `credential_secs` is the lifetime left on
    /// the credential that will be delegated.
    pub fn request(&self, credential_secs: i64) -> anyhow::Result<CreateGlidein> {
        if self.wall_time < MIN_WALL_TIME {
            anyhow::bail!("Wall time must be >= {MIN_WALL_TIME} minutes");
        }

        let mut req = CreateGlidein::new(self.site, &self.condor_host);
        req.count = self.count;
        req.host_count = self.host_count;
        req.wall_time = self.wall_time;
        req.num_cpus = self.num_cpus;
        req.idle_time = Some(self.idle_time.unwrap_or(self.wall_time));
        req.condor_debug = self.condor_debug.clone();
        req.gcb_broker = self.gcb_broker.clone();
        req.ccb_address = self.ccb_address.clone();
        req.rsl = self.rsl.clone();
        req.highport = self.highport;
        req.lowport = self.lowport;

        if let Some(path) = &self.condor_config {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Unable to read config file: {}", path.display()))?;
            req.condor_config = Some(text);
        }

        if let Some(value) = &self.resubmit {
            let resubmit = Resubmit::parse(value.as_deref(), Local::now())?;
            let required = resubmit.required_secs(self.wall_time, Utc::now());
            tracing::debug!(credential_secs, required, "Checking credential lifetime");
            if credential_secs < required {
                anyhow::bail!(
                    "Not enough time left on credential for specified run time (including resubmits)"
                );
            }
            let (resubmits, until) = resubmit.limits();
            req.resubmit = true;
            req.resubmits = resubmits;
            req.until = until;
        }

        Ok(req)
    }
}

pub async fn create(client: &ServiceClient, args: CreateGlideinArgs) -> anyhow::Result<()> {
    let credential = args.credential.load()?;
    let req = args.request(credential.time_left(Utc::now()))?;

    tracing::debug!(site = req.site_id, "Creating glidein");
    let id = client
        .create_glidein(&req)
        .await
        .map_err(|e| anyhow::anyhow!("Unable to create glidein: {e}"))?;
    client
        .submit_glidein(id, &credential)
        .await
        .map_err(|e| anyhow::anyhow!("Unable to submit glidein {id}: {e}"))?;
    println!("Created glidein {id}");
    Ok(())
}

pub async fn list(client: &ServiceClient, args: ListArgs) -> anyhow::Result<()> {
    let glideins = if args.ids.is_empty() {
        client
            .list_glideins(&args.query())
            .await
            .map_err(|e| anyhow::anyhow!("Unable to list glideins: {e}"))?
    } else {
        let mut glideins = Vec::with_capacity(args.ids.len());
        for id in &args.ids {
            match client.get_glidein(*id).await {
                Ok(glidein) => glideins.push(glidein),
                Err(e) => println!("{e}"),
            }
        }
        glideins
    };

    if glideins.is_empty() {
        tracing::debug!("No glideins");
        return Ok(());
    }

    if args.long {
        for glidein in &glideins {
            println!("{}", output::glidein_long(glidein, &Local));
        }
    } else {
        print!("{}", output::glideins_short(&glideins, &Local));
    }
    Ok(())
}

pub async fn remove(client: &ServiceClient, args: RemoveGlideinArgs) -> anyhow::Result<()> {
    let mut failures = 0;
    for id in &args.ids {
        tracing::debug!(id, force = args.force, "Removing glidein");
        if let Err(e) = client.remove_glidein(*id, args.force).await {
            eprintln!("Unable to remove glidein {id}: {e}");
            failures += 1;
        }
    }
    summarize("remove", failures)
}

pub async fn history(client: &ServiceClient, args: HistoryArgs) -> anyhow::Result<()> {
    let mut failures = 0;
    for id in &args.ids {
        match client.glidein_history(*id).await {
            Ok(entries) => print!("{}", output::history(&entries, &Local)),
            Err(e) => {
                eprintln!("Unable to get history of glidein {id}: {e}");
                failures += 1;
            }
        }
    }
    summarize("get history of", failures)
}
