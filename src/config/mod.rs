//! Configuration management.
//!
//! Settings come from a TOML file, then environment overrides. Jobs are
//! validated into [`SweepJob`](crate::services::SweepJob)s before anything
//! is fetched.

mod job;

pub use job::{ActionSetting, JobConfig, ModeSetting};

use crate::feed::{MinifluxClient, MinifluxHttpConfig, SecretResolver};
use crate::observability::LogFormat;
use crate::services::SweepJob;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "FEEDSWEEP_CONFIG_PATH";

/// Default log file size that triggers trimming (5 MiB).
pub const DEFAULT_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of lines kept when trimming the log file.
pub const DEFAULT_LOG_KEEP_LINES: usize = 500;

/// Main configuration for feedsweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedsweepConfig {
    /// Miniflux connection settings.
    pub miniflux: MinifluxSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
    /// Configured jobs.
    pub jobs: Vec<JobConfig>,
    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
    /// Problems noticed while loading, logged once logging is up.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Miniflux connection settings.
#[derive(Debug, Clone, Serialize)]
pub struct MinifluxSettings {
    /// Base URL, with or without `/v1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// API token.
    #[serde(
        serialize_with = "serialize_redacted",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<SecretString>,
    /// Bitwarden secret id holding the URL, used when `url` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitwarden_url_secret: Option<String>,
    /// Bitwarden secret id holding the token, used when `api_key` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitwarden_api_key_secret: Option<String>,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
    /// Entries requested per page.
    pub page_size: usize,
}

impl Default for MinifluxSettings {
    fn default() -> Self {
        let http = MinifluxHttpConfig::default();
        Self {
            url: None,
            api_key: None,
            bitwarden_url_secret: None,
            bitwarden_api_key_secret: None,
            timeout_ms: http.timeout_ms,
            connect_timeout_ms: http.connect_timeout_ms,
            page_size: MinifluxClient::DEFAULT_PAGE_SIZE,
        }
    }
}

impl MinifluxSettings {
    /// Returns the HTTP timeouts.
    #[must_use]
    pub const fn http_config(&self) -> MinifluxHttpConfig {
        MinifluxHttpConfig {
            timeout_ms: self.timeout_ms,
            connect_timeout_ms: self.connect_timeout_ms,
        }
    }

    /// Resolves the URL and token, reading Bitwarden secrets when the
    /// plain values are absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a value is neither set nor
    /// resolvable.
    pub fn credentials(&self, resolver: &SecretResolver) -> Result<(String, SecretString)> {
        let url = match (&self.url, &self.bitwarden_url_secret) {
            (Some(url), _) => url.clone(),
            (None, Some(id)) => resolver.resolve(id)?.expose_secret().to_string(),
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "miniflux url is not set (url or bitwarden_url_secret)".to_string(),
                ));
            },
        };
        let api_key = match (&self.api_key, &self.bitwarden_api_key_secret) {
            (Some(key), _) => key.clone(),
            (None, Some(id)) => resolver.resolve(id)?,
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "miniflux api key is not set (api_key or bitwarden_api_key_secret)"
                        .to_string(),
                ));
            },
        };
        if url.trim().is_empty() {
            return Err(Error::InvalidConfig("miniflux url is empty".to_string()));
        }
        Ok((url, api_key))
    }

    /// Builds a Miniflux client from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if credentials cannot be resolved.
    pub fn client(&self, resolver: &SecretResolver) -> Result<MinifluxClient> {
        let (url, api_key) = self.credentials(resolver)?;
        let client = MinifluxClient::new(&url, api_key)
            .with_page_size(self.page_size)
            .with_http_config(self.http_config());
        if client.base_url() != url.trim() {
            tracing::debug!(url = client.base_url(), "Normalized Miniflux URL");
        }
        Ok(client)
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Append logs to this file instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Trim the log file when it grows beyond this size.
    pub max_bytes: u64,
    /// Lines kept when trimming.
    pub keep_lines: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: None,
            file: None,
            max_bytes: DEFAULT_LOG_MAX_BYTES,
            keep_lines: DEFAULT_LOG_KEEP_LINES,
        }
    }
}

/// Metrics settings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSettings {
    /// Whether metrics are recorded.
    pub enabled: bool,
    /// Prometheus push gateway endpoint, pushed to at exit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_gateway: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Miniflux section.
    pub miniflux: Option<ConfigFileMiniflux>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
    /// Jobs.
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// Miniflux section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMiniflux {
    /// Base URL.
    pub url: Option<String>,
    /// API token.
    pub api_key: Option<String>,
    /// Bitwarden secret id for the URL.
    pub bitwarden_url_secret: Option<String>,
    /// Bitwarden secret id for the token.
    pub bitwarden_api_key_secret: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
    /// Page size.
    pub page_size: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<LogFormat>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
    /// Trim threshold.
    pub max_bytes: Option<u64>,
    /// Lines kept on trim.
    pub keep_lines: Option<usize>,
}

/// Metrics section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMetrics {
    /// Enable metrics.
    pub enabled: Option<bool>,
    /// Push gateway endpoint.
    pub push_gateway: Option<String>,
}

impl FeedsweepConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let mut config = Self::from_toml_str(&contents)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Loads configuration from `explicit`, `FEEDSWEEP_CONFIG_PATH`, or the
    /// default locations, then applies environment overrides.
    ///
    /// An explicitly named file must exist. When none of the default
    /// locations has a file, the default configuration is used.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env_string(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match named {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/feedsweep/` on macOS)
    /// 2. XDG config dir (`~/.config/feedsweep/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        match Self::default_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Default config file locations, most specific first.
    #[must_use]
    pub fn default_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        let platform = base_dirs.config_dir().join("feedsweep").join("config.toml");
        let xdg = base_dirs
            .home_dir()
            .join(".config")
            .join("feedsweep")
            .join("config.toml");

        if platform == xdg {
            vec![platform]
        } else {
            vec![platform, xdg]
        }
    }

    /// Converts a `ConfigFile` to `FeedsweepConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(miniflux) = file.miniflux {
            let settings = &mut config.miniflux;
            settings.url = miniflux.url;
            settings.api_key = miniflux.api_key.map(SecretString::from);
            settings.bitwarden_url_secret = miniflux.bitwarden_url_secret;
            settings.bitwarden_api_key_secret = miniflux.bitwarden_api_key_secret;
            if let Some(v) = miniflux.timeout_ms {
                settings.timeout_ms = v;
            }
            if let Some(v) = miniflux.connect_timeout_ms {
                settings.connect_timeout_ms = v;
            }
            if let Some(v) = miniflux.page_size {
                settings.page_size = v;
            }
        }
        if let Some(logging) = file.logging {
            if let Some(v) = logging.format {
                config.logging.format = v;
            }
            config.logging.filter = logging.filter;
            config.logging.file = logging.file.map(PathBuf::from);
            if let Some(v) = logging.max_bytes {
                config.logging.max_bytes = v;
            }
            if let Some(v) = logging.keep_lines {
                config.logging.keep_lines = v;
            }
        }
        if let Some(metrics) = file.metrics {
            if let Some(v) = metrics.enabled {
                config.metrics.enabled = v;
            }
            config.metrics.push_gateway = metrics.push_gateway;
        }
        config.jobs = file.jobs;

        config
    }

    /// Applies `FEEDSWEEP_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_string);
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("FEEDSWEEP_MINIFLUX_URL") {
            self.miniflux.url = Some(url);
        }
        if let Some(key) = lookup("FEEDSWEEP_MINIFLUX_API_KEY") {
            self.miniflux.api_key = Some(SecretString::from(key));
        }
        if let Some(dry_run) = self.override_bool(&lookup, "FEEDSWEEP_DRY_RUN") {
            for job in &mut self.jobs {
                job.dry_run = dry_run;
            }
        }
        if let Some(format) = lookup("FEEDSWEEP_LOG_FORMAT") {
            match LogFormat::parse(&format) {
                Some(format) => self.logging.format = format,
                None => self
                    .warnings
                    .push(format!("Ignoring unknown FEEDSWEEP_LOG_FORMAT '{format}'")),
            }
        }
        if let Some(file) = lookup("FEEDSWEEP_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        if let Some(enabled) = self.override_bool(&lookup, "FEEDSWEEP_METRICS_ENABLED") {
            self.metrics.enabled = enabled;
        }
        if let Some(endpoint) = lookup("FEEDSWEEP_METRICS_PUSH_GATEWAY") {
            self.metrics.push_gateway = Some(endpoint);
        }
    }

    fn override_bool(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
    ) -> Option<bool> {
        let value = lookup(name)?;
        let parsed = parse_bool(&value);
        if parsed.is_none() {
            self.warnings
                .push(format!("Ignoring unparseable {name} '{value}'"));
        }
        parsed
    }

    /// Validates every job and returns them in file order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for the first invalid job or a
    /// repeated job name.
    pub fn sweep_jobs(&self) -> Result<Vec<SweepJob>> {
        let mut names = HashSet::new();
        self.jobs
            .iter()
            .map(|job| {
                if !names.insert(job.name.as_str()) {
                    return Err(Error::InvalidConfig(format!(
                        "job name '{}' is used more than once",
                        job.name
                    )));
                }
                job.to_job()
            })
            .collect()
    }

    /// Returns the named jobs, or all of them when `names` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a name is unknown, a job is
    /// invalid, or no jobs are configured.
    pub fn select_jobs(&self, names: &[String]) -> Result<Vec<SweepJob>> {
        let jobs = self.sweep_jobs()?;
        if jobs.is_empty() {
            return Err(Error::InvalidConfig("no jobs configured".to_string()));
        }
        if names.is_empty() {
            return Ok(jobs);
        }
        names
            .iter()
            .map(|name| {
                jobs.iter()
                    .find(|job| &job.name == name)
                    .cloned()
                    .ok_or_else(|| Error::InvalidConfig(format!("unknown job '{name}'")))
            })
            .collect()
    }

    /// Renders the configuration as TOML with secrets redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_redacted_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::OperationFailed {
            operation: "render_config".to_string(),
            cause: e.to_string(),
        })
    }
}

#[allow(clippy::ref_option)]
fn serialize_redacted<S: Serializer>(
    value: &Option<SecretString>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_str("[redacted]"),
        None => serializer.serialize_none(),
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
