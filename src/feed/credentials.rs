//! Credential lookup.
//!
//! Miniflux credentials can live in Bitwarden Secrets Manager and are
//! fetched with `bws secret get <id>`, which prints the secret as JSON.

use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::process::Command;

/// Reads secrets through the Bitwarden Secrets Manager CLI.
#[derive(Debug, Clone)]
pub struct SecretResolver {
    program: String,
}

#[derive(Debug, Deserialize)]
struct SecretOutput {
    #[serde(default)]
    value: String,
}

impl SecretResolver {
    /// Default CLI executable.
    pub const DEFAULT_PROGRAM: &'static str = "bws";

    /// Creates a resolver that runs `bws` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: Self::DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Uses a different executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Fetches the value of secret `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the CLI cannot be run, exits
    /// non-zero, or returns an empty value.
    pub fn resolve(&self, id: &str) -> Result<SecretString> {
        let output = Command::new(&self.program)
            .args(["secret", "get", id])
            .output()
            .map_err(|e| {
                Error::InvalidConfig(format!("cannot run '{}' for secret {id}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::InvalidConfig(format!(
                "'{}' failed for secret {id}: {}",
                self.program,
                stderr.trim()
            )));
        }

        let value = parse_secret_output(&String::from_utf8_lossy(&output.stdout))
            .map_err(|cause| Error::InvalidConfig(format!("secret {id}: {cause}")))?;
        tracing::debug!(secret_id = id, "Resolved secret");
        Ok(SecretString::from(value))
    }
}

impl Default for SecretResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_secret_output(stdout: &str) -> std::result::Result<String, String> {
    let parsed: SecretOutput =
        serde_json::from_str(stdout).map_err(|e| format!("unreadable output: {e}"))?;
    let value = parsed.value.trim();
    if value.is_empty() {
        return Err("empty value".to_string());
    }
    Ok(value.to_string())
}

/// Strips trailing slashes and a trailing `/v1` from a Miniflux URL.
///
/// ```rust
/// use feedsweep::feed::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://rss.example.org/v1/"), "https://rss.example.org");
/// assert_eq!(normalize_base_url("https://rss.example.org/"), "https://rss.example.org");
/// ```
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://rss.example.org", "https://rss.example.org" ; "plain")]
    #[test_case("https://rss.example.org/", "https://rss.example.org" ; "trailing slash")]
    #[test_case("https://rss.example.org/v1", "https://rss.example.org" ; "api suffix")]
    #[test_case("https://rss.example.org/v1/", "https://rss.example.org" ; "api suffix and slash")]
    #[test_case("https://example.org/miniflux/v1", "https://example.org/miniflux" ; "sub path")]
    #[test_case(" https://rss.example.org/v10 ", "https://rss.example.org/v10" ; "other version kept")]
    fn test_normalize_base_url(input: &str, expected: &str) {
        assert_eq!(normalize_base_url(input), expected);
    }

    #[test]
    fn test_parse_secret_output() {
        let out = r#"{"id":"da48","key":"miniflux-url","value":" https://rss.example.org \n"}"#;
        assert_eq!(
            parse_secret_output(out).unwrap(),
            "https://rss.example.org"
        );
        assert!(parse_secret_output(r#"{"id":"x","value":""}"#).is_err());
        assert!(parse_secret_output(r#"{"id":"x"}"#).is_err());
        assert!(parse_secret_output("not json").is_err());
    }

    #[test]
    fn test_missing_program_is_config_error() {
        let resolver = SecretResolver::new().with_program("feedsweep-test-no-such-binary");
        let err = resolver.resolve("abc").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
