//! Row types for the `sites`, `glideins` and history tables.
//!
//! Rows mirror the table layout (execution services flattened into
//! columns, states as text) and convert into the shared domain types in
//! `corral_core`.

pub mod glidein;
pub mod history;
pub mod site;

/// Wrap a row conversion failure as a decode error.
pub(crate) fn decode_error(err: corral_core::error::CoreError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
