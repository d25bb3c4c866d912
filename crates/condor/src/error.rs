/// Error type for Condor commands and user-log processing.
#[derive(Debug, thiserror::Error)]
pub enum CondorError {
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed with code {code}:\n\nStandard out:\n{stdout}\nStandard error:\n{stderr}")]
    CommandFailed {
        command: &'static str,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Unable to get job id from condor_submit output")]
    MissingJobId,

    #[error("Job has not been submitted")]
    NotSubmitted,

    #[error("{0}")]
    Parse(String),
}

impl CondorError {
    /// Wrap an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
