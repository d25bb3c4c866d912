use std::path::{Path, PathBuf};
use std::time::Duration;

/// Provisioning service configuration loaded from environment variables.
///
/// Relative paths are resolved against `CORRAL_HOME`.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub home: PathBuf,
    /// Site install script submitted as the install job executable.
    pub install: PathBuf,
    pub uninstall: PathBuf,
    /// Glidein run script, shipped as an input file of the glidein job.
    pub run: PathBuf,
    /// Glidein start script, the glidein job executable.
    pub start: PathBuf,
    /// Replica location service URL passed to install jobs.
    pub rls: String,
    /// Package mapper URL passed to install jobs.
    pub mapper: String,
    /// Default condor_config shipped with glideins that have none of their own.
    pub glidein_condor_config: PathBuf,
    /// Root of the per-site and per-glidein job directories.
    pub working_directory: PathBuf,
    pub condor_home: PathBuf,
    pub condor_config: PathBuf,
    pub netlogger_file: PathBuf,
    pub gridmap_file: PathBuf,
    /// Host name advertised to jobs as `CORRAL_SERVER`.
    pub service_host: String,
    pub cleanup_interval_secs: u64,
    pub poll_interval_secs: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                        |
    /// |--------------------------------|--------------------------------|
    /// | `CORRAL_HOME`                  | current directory              |
    /// | `CORRAL_INSTALL`               | `libexec/glidein_install`      |
    /// | `CORRAL_UNINSTALL`             | `libexec/glidein_uninstall`    |
    /// | `CORRAL_RUN`                   | `libexec/glidein_run`          |
    /// | `CORRAL_START`                 | `libexec/glidein_start`        |
    /// | `CORRAL_RLS`                   | empty                          |
    /// | `CORRAL_MAPPER`                | empty                          |
    /// | `CORRAL_GLIDEIN_CONDOR_CONFIG` | `etc/glidein_condor_config`    |
    /// | `CORRAL_WORKING_DIRECTORY`     | `var`                          |
    /// | `CONDOR_HOME`                  | `/usr`                         |
    /// | `CONDOR_CONFIG`                | `/etc/condor/condor_config`    |
    /// | `CORRAL_NETLOGGER_FILE`        | `var/log/corral.nl`            |
    /// | `CORRAL_GRIDMAP_FILE`          | `etc/grid-mapfile`             |
    /// | `CORRAL_SERVICE_HOST`          | `localhost`                    |
    /// | `CORRAL_CLEANUP_INTERVAL_SECS` | `1800`                         |
    /// | `CORRAL_POLL_INTERVAL_SECS`    | `10`                           |
    pub fn from_env() -> Self {
        let home = std::env::var("CORRAL_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let mut config = Self::with_home(home);

        let path = |key: &str, current: &mut PathBuf, home: &Path| {
            if let Ok(value) = std::env::var(key) {
                *current = resolve(home, &value);
            }
        };
        let home = config.home.clone();
        path("CORRAL_INSTALL", &mut config.install, &home);
        path("CORRAL_UNINSTALL", &mut config.uninstall, &home);
        path("CORRAL_RUN", &mut config.run, &home);
        path("CORRAL_START", &mut config.start, &home);
        path("CORRAL_GLIDEIN_CONDOR_CONFIG", &mut config.glidein_condor_config, &home);
        path("CORRAL_WORKING_DIRECTORY", &mut config.working_directory, &home);
        path("CONDOR_HOME", &mut config.condor_home, &home);
        path("CONDOR_CONFIG", &mut config.condor_config, &home);
        path("CORRAL_NETLOGGER_FILE", &mut config.netlogger_file, &home);
        path("CORRAL_GRIDMAP_FILE", &mut config.gridmap_file, &home);

        if let Ok(rls) = std::env::var("CORRAL_RLS") {
            config.rls = rls;
        }
        if let Ok(mapper) = std::env::var("CORRAL_MAPPER") {
            config.mapper = mapper;
        }
        if let Ok(host) = std::env::var("CORRAL_SERVICE_HOST") {
            config.service_host = host;
        }

        config.cleanup_interval_secs = std::env::var("CORRAL_CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| "1800".into())
            .parse()
            .expect("CORRAL_CLEANUP_INTERVAL_SECS must be a valid u64");

        config.poll_interval_secs = std::env::var("CORRAL_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("CORRAL_POLL_INTERVAL_SECS must be a valid u64");

        config
    }

    /// Defaults laid out under `home`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            install: home.join("libexec/glidein_install"),
            uninstall: home.join("libexec/glidein_uninstall"),
            run: home.join("libexec/glidein_run"),
            start: home.join("libexec/glidein_start"),
            rls: String::new(),
            mapper: String::new(),
            glidein_condor_config: home.join("etc/glidein_condor_config"),
            working_directory: home.join("var"),
            condor_home: PathBuf::from("/usr"),
            condor_config: PathBuf::from("/etc/condor/condor_config"),
            netlogger_file: home.join("var/log/corral.nl"),
            gridmap_file: home.join("etc/grid-mapfile"),
            service_host: "localhost".to_string(),
            cleanup_interval_secs: 1800,
            poll_interval_secs: 10,
            home,
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Absolute paths are kept; relative ones are joined onto `home`.
pub fn resolve(home: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}
