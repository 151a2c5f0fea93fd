//! Structured logging.

use crate::config::LoggingSettings;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Log file; stderr when absent.
    pub file: Option<PathBuf>,
    /// Size that triggers trimming.
    pub max_bytes: u64,
    /// Lines kept when trimming.
    pub keep_lines: usize,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings.
    ///
    /// `RUST_LOG` takes precedence over the configured filter; `verbose`
    /// raises the default level from `info` to `debug`.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let default_directive = settings.filter.clone().unwrap_or_else(|| {
            if verbose {
                "feedsweep=debug,info".to_string()
            } else {
                "info".to_string()
            }
        });
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&default_directive))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        Self {
            format: settings.format,
            filter,
            file: settings.file.clone(),
            max_bytes: settings.max_bytes,
            keep_lines: settings.keep_lines,
        }
    }
}

/// Trims `path` to its last `keep_lines` lines if it is larger than
/// `max_bytes`.
///
/// Returns true if the file was trimmed. A missing file is left alone.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or rewritten.
pub fn trim_log_file(path: &Path, max_bytes: u64, keep_lines: usize) -> Result<bool> {
    let Ok(metadata) = fs::metadata(path) else {
        return Ok(false);
    };
    if metadata.len() <= max_bytes {
        return Ok(false);
    }

    let contents = fs::read(path).map_err(|e| Error::OperationFailed {
        operation: "read_log_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    let text = String::from_utf8_lossy(&contents);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(keep_lines);

    let mut kept = lines[start..].join("\n");
    if !kept.is_empty() {
        kept.push('\n');
    }
    fs::write(path, kept).map_err(|e| Error::OperationFailed {
        operation: "trim_log_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    Ok(true)
}
