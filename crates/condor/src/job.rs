//! Condor job descriptions and submit script generation.

use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use corral_core::state::ServiceType;

use crate::error::CondorError;

/// Condor `grid_resource` type for a Globus gatekeeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondorGridType {
    Gt2,
    Gt4,
    Gt5,
}

impl CondorGridType {
    pub fn as_str(self) -> &'static str {
        match self {
            CondorGridType::Gt2 => "gt2",
            CondorGridType::Gt4 => "gt4",
            CondorGridType::Gt5 => "gt5",
        }
    }
}

impl From<ServiceType> for CondorGridType {
    fn from(service_type: ServiceType) -> Self {
        match service_type {
            ServiceType::Gt2 => CondorGridType::Gt2,
            ServiceType::Gt4 => CondorGridType::Gt4,
            ServiceType::Gt5 => CondorGridType::Gt5,
        }
    }
}

/// Condor universe. The service only submits `grid` jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CondorUniverse {
    Vanilla,
    Standard,
    #[default]
    Grid,
    Local,
    Scheduler,
}

impl CondorUniverse {
    pub fn as_str(self) -> &'static str {
        match self {
            CondorUniverse::Vanilla => "vanilla",
            CondorUniverse::Standard => "standard",
            CondorUniverse::Grid => "grid",
            CondorUniverse::Local => "local",
            CondorUniverse::Scheduler => "scheduler",
        }
    }
}

/// Value of a custom ClassAd attribute (`+Name = value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XattrValue {
    Str(String),
    Int(i64),
}

impl fmt::Display for XattrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XattrValue::Str(s) => write!(f, "\"{s}\""),
            XattrValue::Int(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A job submitted through the local Condor schedd.
///
/// Every file Condor reads or writes for the job lives in `job_dir`:
/// `submit`, `log`, `output`, `error`, `credential` and `jobid`.
#[derive(Debug, Clone)]
pub struct CondorJob {
    job_dir: PathBuf,
    pub universe: CondorUniverse,
    pub grid_resource: Option<(CondorGridType, String)>,
    pub globus_rsl: Option<String>,
    pub globus_xml: Option<String>,
    /// Proxy passed as `x509userproxy` when set.
    pub credential: Option<PathBuf>,
    pub executable: String,
    /// Local executables are transferred by Condor; remote ones are not.
    pub local_executable: bool,
    pub arguments: Vec<String>,
    environment: Vec<(String, String)>,
    pub input_files: Vec<String>,
    pub output_files: Vec<String>,
    pub requirements: Option<String>,
    pub remote_dir: Option<String>,
    pub job_id: Option<String>,
    xattrs: Vec<(String, XattrValue)>,
}

impl CondorJob {
    pub fn new(job_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_dir: job_dir.into(),
            universe: CondorUniverse::Grid,
            grid_resource: None,
            globus_rsl: None,
            globus_xml: None,
            credential: None,
            executable: String::new(),
            local_executable: false,
            arguments: Vec::new(),
            environment: Vec::new(),
            input_files: Vec::new(),
            output_files: Vec::new(),
            requirements: None,
            remote_dir: None,
            job_id: None,
            xattrs: Vec::new(),
        }
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.job_dir.join("log")
    }

    pub fn error_path(&self) -> PathBuf {
        self.job_dir.join("error")
    }

    pub fn output_path(&self) -> PathBuf {
        self.job_dir.join("output")
    }

    pub fn submit_path(&self) -> PathBuf {
        self.job_dir.join("submit")
    }

    pub fn credential_path(&self) -> PathBuf {
        self.job_dir.join("credential")
    }

    pub fn jobid_path(&self) -> PathBuf {
        self.job_dir.join("jobid")
    }

    pub fn set_grid_resource(&mut self, grid_type: CondorGridType, contact: impl Into<String>) {
        self.grid_resource = Some((grid_type, contact.into()));
    }

    pub fn add_argument(&mut self, arg: impl Into<String>) {
        self.arguments.push(arg.into());
    }

    /// Set an environment variable, replacing an earlier value for the same name.
    pub fn add_environment(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.environment.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.environment.push((name, value)),
        }
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.environment
    }

    pub fn add_xattr(&mut self, name: impl Into<String>, value: XattrValue) {
        self.xattrs.push((name.into(), value));
    }

    pub fn xattrs(&self) -> &[(String, XattrValue)] {
        &self.xattrs
    }

    /// Render the Condor submit description for this job.
    pub fn submit_script(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_submit_script(&mut out);
        out
    }

    fn write_submit_script(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "universe = {}", self.universe.as_str())?;

        if self.universe == CondorUniverse::Grid {
            if let Some((grid_type, contact)) = &self.grid_resource {
                writeln!(out, "grid_resource = {} {}", grid_type.as_str(), contact)?;
            }
            for line in [
                "stream_input = False",
                "stream_output = False",
                "stream_error = False",
                "transfer_input = True",
                "transfer_output = True",
                "transfer_error = True",
            ] {
                writeln!(out, "{line}")?;
            }
            if let Some(rsl) = &self.globus_rsl {
                writeln!(out, "globus_rsl = {rsl}")?;
            }
            if let Some(xml) = &self.globus_xml {
                writeln!(out, "globus_xml = {xml}")?;
            }
            if let Some(credential) = &self.credential {
                writeln!(out, "x509userproxy = {}", credential.display())?;
            }
        }

        writeln!(out, "executable = {}", self.executable)?;
        if !self.local_executable {
            writeln!(out, "transfer_executable = false")?;
        }

        if !self.arguments.is_empty() {
            out.push_str("arguments = \"");
            for arg in &self.arguments {
                out.push(' ');
                out.push_str(arg);
            }
            out.push_str("\"\n");
        }

        if !self.environment.is_empty() {
            out.push_str("environment = ");
            for (name, value) in &self.environment {
                write!(out, "{name}={value};")?;
            }
            out.push('\n');
        }

        writeln!(out, "log = {}", self.log_path().display())?;
        writeln!(out, "output = {}", self.output_path().display())?;
        writeln!(out, "error = {}", self.error_path().display())?;
        writeln!(out, "notification = Never")?;

        if let Some(requirements) = &self.requirements {
            writeln!(out, "requirements = {requirements}")?;
        }
        if let Some(remote_dir) = &self.remote_dir {
            writeln!(out, "remote_initialdir = {remote_dir}")?;
        }
        writeln!(out, "initialdir = {}", self.job_dir.display())?;

        if !self.input_files.is_empty() {
            writeln!(out, "transfer_input_files = {}", self.input_files.join(","))?;
        }
        if !self.output_files.is_empty() {
            writeln!(out, "transfer_output_files = {}", self.output_files.join(","))?;
        }
        if !self.input_files.is_empty() || !self.output_files.is_empty() {
            writeln!(out, "when_to_transfer_output = ON_EXIT")?;
        }

        for (name, value) in &self.xattrs {
            writeln!(out, "+{name} = {value}")?;
        }

        writeln!(out, "queue")
    }

    /// Write the submit script into the job directory.
    pub async fn write_submit_file(&self) -> Result<(), CondorError> {
        tokio::fs::write(self.submit_path(), self.submit_script())
            .await
            .map_err(|e| CondorError::io("Unable to write submit script", e))
    }

    /// Persist the Condor job id so a restarted service can find the job.
    pub async fn save_job_id(&self) -> Result<(), CondorError> {
        let id = self.job_id.as_deref().ok_or(CondorError::NotSubmitted)?;
        tokio::fs::write(self.jobid_path(), id)
            .await
            .map_err(|e| CondorError::io("Unable to save job id", e))
    }

    /// Read back a job id written by [`CondorJob::save_job_id`].
    pub async fn load_job_id(&mut self) -> Result<(), CondorError> {
        let id = tokio::fs::read_to_string(self.jobid_path())
            .await
            .map_err(|e| CondorError::io("Unable to read job id", e))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(CondorError::NotSubmitted);
        }
        self.job_id = Some(id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
