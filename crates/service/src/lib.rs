//! Site and glidein provisioning.
//!
//! Resources are driven by events from a single dispatcher
//! ([`ResourceEventHandler`]). Condor jobs are followed through their user
//! logs and report back by queueing more events.

pub mod cleaner;
pub mod config;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod glidein;
pub mod home;
pub mod jobs;
pub mod listeners;
pub mod recovery;
pub mod services;
pub mod site;

pub use config::ServiceConfig;
pub use dispatcher::ResourceEventHandler;
pub use error::ServiceError;
pub use glidein::GlideinResource;
pub use home::{GlideinHome, ResourceHome, SiteHome};
pub use services::Services;
pub use site::SiteResource;
