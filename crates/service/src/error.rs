use corral_condor::CondorError;
use corral_core::error::CoreError;

/// Errors raised while driving sites and glideins.
///
/// Contextual variants keep the underlying error as their source so the
/// full chain can be stored as a resource's long message.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Condor(#[from] CondorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Message(String),

    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ServiceError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Attach a message to a lower-level error.
pub trait ResultExt<T> {
    fn context(self, message: &str) -> Result<T, ServiceError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: &str) -> Result<T, ServiceError> {
        self.map_err(|e| ServiceError::Context {
            message: message.to_string(),
            source: Box::new(e),
        })
    }
}
