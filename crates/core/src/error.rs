use crate::types::DbId;

/// Domain errors shared by the service, the HTTP layer and the client.
///
/// Messages are user-facing: they end up in the `error` field of API
/// responses and, for state machine failures, in a resource's short message.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Maximum length of a short (list view) failure message.
pub const SHORT_MESSAGE_LEN: usize = 64;

/// Reduce an error message to something that fits in a short message column.
///
/// The full error chain is kept in the long message; the short message is
/// the first [`SHORT_MESSAGE_LEN`] characters, cut at the first line break.
pub fn short_failure_message(message: &str) -> String {
    let truncated: String = message.chars().take(SHORT_MESSAGE_LEN).collect();
    match truncated.find('\n') {
        Some(lf) if lf > 0 => truncated[..lf].to_string(),
        _ => truncated,
    }
}

/// Render an error and all of its sources, one per line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\nCaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
