//! Shared domain types for Corral.
//!
//! Pure types and rules used by the service, the HTTP layer and the
//! command-line client. No I/O beyond the NetLogger appender and the
//! grid-mapfile loader.

pub mod credential;
pub mod error;
pub mod glidein;
pub mod gridmap;
pub mod history;
pub mod netlogger;
pub mod site;
pub mod state;
pub mod types;
