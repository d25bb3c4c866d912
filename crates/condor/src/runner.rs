//! Running `condor_submit` and `condor_rm`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;

use crate::error::CondorError;
use crate::job::CondorJob;

static JOB_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\* Proc (([0-9]+)\.([0-9]+)):").expect("valid regex"));

/// Submits and cancels Condor jobs.
#[async_trait]
pub trait CondorRunner: Send + Sync {
    /// Submit `job`, recording the assigned job id on it and in its `jobid` file.
    async fn submit(&self, job: &mut CondorJob) -> Result<(), CondorError>;

    /// Remove a submitted job from the queue.
    async fn cancel(&self, job: &CondorJob) -> Result<(), CondorError>;
}

/// Extract `cluster.proc` from `condor_submit -verbose` output.
pub fn parse_job_id(stdout: &str) -> Option<String> {
    JOB_ID_RE
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// [`CondorRunner`] backed by the Condor command-line tools.
#[derive(Debug, Clone)]
pub struct CondorCli {
    condor_home: PathBuf,
    condor_config: PathBuf,
}

impl CondorCli {
    pub fn new(condor_home: impl Into<PathBuf>, condor_config: impl Into<PathBuf>) -> Self {
        Self {
            condor_home: condor_home.into(),
            condor_config: condor_config.into(),
        }
    }

    fn command(&self, name: &str, job_dir: &Path) -> Command {
        let mut cmd = Command::new(self.condor_home.join("bin").join(name));
        cmd.current_dir(job_dir)
            .env("CONDOR_HOME", &self.condor_home)
            .env("CONDOR_CONFIG", &self.condor_config)
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CondorRunner for CondorCli {
    async fn submit(&self, job: &mut CondorJob) -> Result<(), CondorError> {
        job.write_submit_file().await?;

        let output = self
            .command("condor_submit", job.job_dir())
            .arg("-verbose")
            .arg(job.submit_path())
            .output()
            .await
            .map_err(|e| CondorError::io("Unable to submit job", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(CondorError::CommandFailed {
                command: "condor_submit",
                code: output.status.code().unwrap_or(-1),
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let job_id = parse_job_id(&stdout).ok_or(CondorError::MissingJobId)?;
        tracing::debug!(job_id = %job_id, dir = %job.job_dir().display(), "Submitted Condor job");
        job.job_id = Some(job_id);
        job.save_job_id().await
    }

    async fn cancel(&self, job: &CondorJob) -> Result<(), CondorError> {
        let job_id = job.job_id.as_deref().ok_or(CondorError::NotSubmitted)?;

        let output = self
            .command("condor_rm", job.job_dir())
            .arg(job_id)
            .output()
            .await
            .map_err(|e| CondorError::io("Unable to cancel job", e))?;

        if !output.status.success() {
            return Err(CondorError::CommandFailed {
                command: "condor_rm",
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        tracing::debug!(job_id, "Removed Condor job");
        Ok(())
    }
}
