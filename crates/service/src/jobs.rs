//! Condor job descriptions for site install/uninstall and glidein jobs.

use std::path::PathBuf;
use std::sync::LazyLock;

use corral_condor::{CondorGridType, CondorJob, XattrValue};
use corral_core::glidein::Glidein;
use corral_core::site::{ExecutionService, Site};
use regex::Regex;

use crate::config::ServiceConfig;

static DEBUG_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ ,;:]+").expect("valid regex"));

/// Install and uninstall jobs may run for at most this many minutes.
const SITE_JOB_MAX_TIME: i32 = 5;

/// Name of a glidein's own condor_config inside its job directory.
pub const CUSTOM_CONDOR_CONFIG: &str = "glidein_condor_config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteJobKind {
    Install,
    Uninstall,
}

impl SiteJobKind {
    /// Job directory name and NetLogger suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            SiteJobKind::Install => "install",
            SiteJobKind::Uninstall => "uninstall",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SiteJobKind::Install => "Install",
            SiteJobKind::Uninstall => "Uninstall",
        }
    }
}

fn set_grid_resource(job: &mut CondorJob, service: &ExecutionService) {
    job.set_grid_resource(
        CondorGridType::from(service.service_type),
        service.service_contact.clone(),
    );
}

fn add_site_identity(job: &mut CondorJob, site: &Site, username: &str, config: &ServiceConfig) {
    for var in &site.environment {
        job.add_environment(var.variable.clone(), var.value.clone());
    }
    job.add_environment("CORRAL_SERVER", config.service_host.clone());
    job.add_environment("CORRAL_SITE_ID", site.id.to_string());
    job.add_environment("CORRAL_SITE_NAME", site.name.clone());
    job.add_environment("CORRAL_USERNAME", username);

    job.add_xattr("CorralServer", XattrValue::Str(config.service_host.clone()));
    job.add_xattr("CorralSiteId", XattrValue::Int(site.id));
    job.add_xattr("CorralSiteName", XattrValue::Str(site.name.clone()));
    job.add_xattr("CorralUsername", XattrValue::Str(username.to_string()));
}

// ---------------------------------------------------------------------------
// Site jobs
// ---------------------------------------------------------------------------

/// Build the install or uninstall job for `site`, run through its staging
/// service.
pub fn site_job(site: &Site, config: &ServiceConfig, kind: SiteJobKind, job_dir: PathBuf) -> CondorJob {
    let mut job = CondorJob::new(job_dir);
    let service = &site.staging_service;
    set_grid_resource(&mut job, service);

    let project = service.project.as_deref();
    let queue = service.queue.as_deref();
    if service.service_type.uses_rsl() {
        let mut rsl = String::new();
        if let Some(project) = project {
            rsl.push_str(&format!("(project={project})"));
        }
        if let Some(queue) = queue {
            rsl.push_str(&format!("(queue={queue})"));
        }
        rsl.push_str(&format!("(maxTime={SITE_JOB_MAX_TIME})"));
        job.globus_rsl = Some(rsl);
    } else {
        let mut xml = String::new();
        if let Some(project) = project {
            xml.push_str(&format!("<project>{project}</project>"));
        }
        if let Some(queue) = queue {
            xml.push_str(&format!("<queue>{queue}</queue>"));
        }
        xml.push_str(&format!("<maxTime>{SITE_JOB_MAX_TIME}</maxTime>"));
        job.globus_xml = Some(xml);
    }

    let executable = match kind {
        SiteJobKind::Install => &config.install,
        SiteJobKind::Uninstall => &config.uninstall,
    };
    job.executable = executable.display().to_string();
    job.local_executable = true;

    add_site_identity(&mut job, site, &site.local_username, config);

    job.add_argument(format!("-installPath {}", site.install_path));
    if kind == SiteJobKind::Install {
        match (&site.condor_package, &site.condor_version) {
            (Some(package), _) => job.add_argument(format!("-condorPackage {package}")),
            (None, Some(version)) => job.add_argument(format!("-condorVersion {version}")),
            (None, None) => {}
        }
        job.add_argument(format!("-rls {}", config.rls));
        job.add_argument(format!("-mapper {}", config.mapper));
    }

    job.output_files.push("status".to_string());
    job
}

// ---------------------------------------------------------------------------
// Glidein jobs
// ---------------------------------------------------------------------------

/// Resource requirements for a glidein job. User-supplied RSL (or XML) wins
/// over every key it already sets.
pub fn glidein_resource_spec(glidein: &Glidein, service: &ExecutionService) -> String {
    let mut spec = glidein.rsl.clone().unwrap_or_default();

    let mut add = |present: &str, value: String| {
        if !spec.contains(present) {
            spec.push_str(&value);
        }
    };

    if service.service_type.uses_rsl() {
        if let Some(project) = &service.project {
            add("(project=", format!("(project={project})"));
        }
        if let Some(queue) = &service.queue {
            add("(queue=", format!("(queue={queue})"));
        }
        add("(hostCount=", format!("(hostCount={})", glidein.host_count));
        add("(count=", format!("(count={})", glidein.count));
        add("(jobType=", "(jobType=multiple)".to_string());
        add("(maxTime=", format!("(maxTime={})", glidein.wall_time));
    } else {
        add("<count>", format!("<count>{}</count>", glidein.count));
        add("<hostCount>", format!("<hostCount>{}</hostCount>", glidein.host_count));
        if let Some(project) = &service.project {
            add("<project>", format!("<project>{project}</project>"));
        }
        if let Some(queue) = &service.queue {
            add("<queue>", format!("<queue>{queue}</queue>"));
        }
        add("<maxTime>", format!("<maxTime>{}</maxTime>", glidein.wall_time));
        add("<jobType>", "<jobType>multiple</jobType>".to_string());
    }
    spec
}

/// Build the glidein job. `condor_config` is the input file that becomes
/// the glidein's condor_config.
pub fn glidein_job(
    glidein: &Glidein,
    site: &Site,
    config: &ServiceConfig,
    job_dir: PathBuf,
    condor_config: String,
) -> CondorJob {
    let mut job = CondorJob::new(job_dir);
    let service = &site.glidein_service;
    set_grid_resource(&mut job, service);

    let spec = glidein_resource_spec(glidein, service);
    if service.service_type.uses_rsl() {
        job.globus_rsl = Some(spec);
    } else {
        job.globus_xml = Some(spec);
    }

    job.executable = config.start.display().to_string();
    job.local_executable = true;
    job.input_files.push(config.run.display().to_string());

    add_site_identity(&mut job, site, &glidein.local_username, config);
    job.add_environment("CORRAL_GLIDEIN_ID", glidein.id.to_string());
    job.add_xattr("CorralGlideinId", XattrValue::Int(glidein.id));

    job.add_argument(format!("-installPath {}", site.install_path));
    job.add_argument(format!("-localPath {}", site.local_path));
    job.add_argument(format!("-condorHost {}", glidein.condor_host));
    // Leave the glidein a minute to exit before the batch system kills it.
    job.add_argument(format!("-wallTime {}", glidein.wall_time - 1));
    if let Some(broker) = &glidein.gcb_broker {
        job.add_argument(format!("-gcbBroker {broker}"));
    }
    if let Some(address) = &glidein.ccb_address {
        job.add_argument(format!("-ccbAddress {address}"));
    }
    if let Some(idle) = glidein.idle_time.filter(|t| *t > 0) {
        job.add_argument(format!("-idleTime {idle}"));
    }
    if let Some(debug) = &glidein.condor_debug {
        for level in DEBUG_SPLIT_RE.split(debug).filter(|l| !l.is_empty()) {
            job.add_argument(format!("-debug {level}"));
        }
    }
    if glidein.num_cpus > 0 {
        job.add_argument(format!("-numCpus {}", glidein.num_cpus));
    }
    if let Some(high) = glidein.highport.filter(|p| *p > 0) {
        job.add_argument(format!("-highport {high}"));
    }
    if let Some(low) = glidein.lowport.filter(|p| *p > 0) {
        job.add_argument(format!("-lowport {low}"));
    }

    job.input_files.push(condor_config);
    job.output_files.push("status".to_string());
    job
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
