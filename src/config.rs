//! Application configuration and environment variable parsing.
//!
//! This module handles loading configuration settings from the environment (e.g., .env file).
//! It defines the `AppConfig` struct which governs where the upstream GitHub API lives,
//! how long a single upstream call may take, and how the caller's session is located.
//!
//! The request-volume caps (repositories listed, repositories processed, commits and
//! pull requests per repository) are fixed constants in `fetcher` and `github`, not settings.

use serde::Deserialize;
use std::time::Duration as StdDuration;

/// Output format for the tracing subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Base URI of the GitHub REST API.
    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,

    /// Value of the `X-GitHub-Api-Version` header sent with every upstream call.
    #[serde(default = "default_github_api_version")]
    pub github_api_version: String,

    /// Timeout applied to each individual upstream call, in seconds.
    #[serde(default = "default_upstream_timeout_seconds")]
    pub upstream_timeout_seconds: u64,

    /// Name of the cookie carrying the caller's session token.
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Directory holding the built dashboard assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_github_api_version() -> String {
    "2022-11-28".to_string()
}

fn default_upstream_timeout_seconds() -> u64 {
    10
}

fn default_session_cookie_name() -> String {
    "techpulse.session-token".to_string()
}

fn default_static_dir() -> String {
    "dist".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            github_api_base: default_github_api_base(),
            github_api_version: default_github_api_version(),
            upstream_timeout_seconds: default_upstream_timeout_seconds(),
            session_cookie_name: default_session_cookie_name(),
            static_dir: default_static_dir(),
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn upstream_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.upstream_timeout_seconds)
    }
}
