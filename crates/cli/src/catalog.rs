//! TOML site catalog.
//!
//! ```toml
//! [global]
//! installPath = "/u/ac/juve/glidein"
//! condorVersion = "7.2.4"
//! project = "TG-CCR080002N"
//!
//! [abe]
//! localPath = "/cfs/scratch/juve/glidein"
//! stagingService = "GT2 grid-abe.ncsa.teragrid.org/jobmanager-fork"
//! glideinService = "GT2 grid-abe.ncsa.teragrid.org/jobmanager-pbs"
//! environment = "GLOBUS_LOCATION=/usr/globus:PATH=/bin"
//! ```
//!
//! Keys missing from a site's table are looked up in `[global]`.

use std::path::Path;
use std::sync::LazyLock;

use corral_core::site::{CreateSite, EnvironmentVariable, ExecutionServiceSpec};
use corral_core::state::ServiceType;
use regex::Regex;

pub const GLOBAL: &str = "global";

static ENV_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^=]+)=([^:]+):?").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Unable to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error reading TOML catalog file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Site '{0}' not found in site catalog")]
    UnknownSite(String),

    #[error("Missing required parameter '{key}' for site '{site}'")]
    Missing { key: &'static str, site: String },

    #[error("Unable to create {label} service for site '{site}'. Are you sure you used the right format for {key}?")]
    BadService {
        label: &'static str,
        key: &'static str,
        site: String,
    },
}

#[derive(Debug)]
pub struct Catalog {
    table: toml::Table,
}

impl Catalog {
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        Ok(Self {
            table: text.parse()?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Names of every site table, excluding `[global]`.
    pub fn site_names(&self) -> Vec<String> {
        self.table
            .iter()
            .filter(|(name, value)| name.as_str() != GLOBAL && value.is_table())
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn value(&self, site: &str, key: &str) -> Option<String> {
        let lookup = |table: &str| {
            self.table
                .get(table)
                .and_then(|t| t.get(key))
                .map(|v| match v {
                    toml::Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
        };
        lookup(site).or_else(|| lookup(GLOBAL))
    }

    fn service(
        &self,
        site: &str,
        key: &'static str,
        label: &'static str,
    ) -> Result<ExecutionServiceSpec, CatalogError> {
        let value = self.value(site, key).ok_or_else(|| CatalogError::Missing {
            key,
            site: site.to_string(),
        })?;
        let bad = || CatalogError::BadService {
            label,
            key,
            site: site.to_string(),
        };
        let (kind, contact) = value.split_once(' ').ok_or_else(bad)?;
        let service_type: ServiceType = kind.to_uppercase().parse().map_err(|_| bad())?;
        Ok(ExecutionServiceSpec {
            service_type: Some(service_type),
            service_contact: Some(contact.trim().to_string()),
            project: self.value(site, "project"),
            queue: self.value(site, "queue"),
        })
    }

    /// Build the create request for `name`.
    pub fn site(&self, name: &str) -> Result<CreateSite, CatalogError> {
        if !self.table.get(name).is_some_and(toml::Value::is_table) || name == GLOBAL {
            return Err(CatalogError::UnknownSite(name.to_string()));
        }

        let environment = self
            .value(name, "environment")
            .map(|env| parse_environment(&env))
            .unwrap_or_default();

        Ok(CreateSite {
            name: Some(name.to_string()),
            install_path: self.value(name, "installPath"),
            local_path: self.value(name, "localPath"),
            staging_service: Some(self.service(name, "stagingService", "staging")?),
            glidein_service: Some(self.service(name, "glideinService", "glidein")?),
            condor_version: self.value(name, "condorVersion"),
            condor_package: self.value(name, "condorPackage"),
            environment,
        })
    }
}

/// Parse `K=V:K2=V2`.
pub fn parse_environment(text: &str) -> Vec<EnvironmentVariable> {
    ENV_PAIR
        .captures_iter(text)
        .map(|cap| EnvironmentVariable {
            variable: cap[1].to_string(),
            value: cap[2].to_string(),
        })
        .collect()
}
