//! `corral` command-line client.

pub mod catalog;
pub mod client;
pub mod commands;
pub mod credential;
pub mod output;
pub mod resubmit;
