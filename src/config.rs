//! Configuration for the scope machinery.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic** — values set via builder methods (`policy(..)`)
//! 2. **Environment variables** — values from `TEARDOWN_SCOPE_*` env vars
//! 3. **Config file** — values loaded from TOML (requires `config-file` feature)
//! 4. **Defaults** — [`TeardownConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `TEARDOWN_SCOPE_POLICY` | `private` / `shared` | `policy` |

use serde::{Deserialize, Serialize};

/// Environment variable name for the test scope policy.
pub const ENV_POLICY: &str = "TEARDOWN_SCOPE_POLICY";

/// Error produced while resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held an unparseable value.
    #[error("invalid value for {var}: {message}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// What was wrong with it.
        message: String,
    },
    /// A config file could not be read or parsed.
    #[error("failed to load config: {0}")]
    File(String),
}

/// Whether a test body shares its setup's cleanup list or owns one.
///
/// With [`Private`](Self::Private), a setup hook's scope is current only
/// while the hook body runs; each test body gets its own scope, drained as
/// soon as the body finishes. Drain order for a test nested in groups A ⊃ B:
/// test → B's per-each setups → A's per-each setups → B's group setups →
/// A's group setups.
///
/// With [`Shared`](Self::Shared), a setup hook's scope stays current until
/// its matching after-hook drains it. A test body registers into the innermost
/// setup that is still installed: its per-each setup if there is one (drained
/// right after the test), otherwise its group setup (drained after the last
/// test of the group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestScopePolicy {
    /// Test bodies own a private scope.
    #[default]
    Private,
    /// Test bodies share the innermost installed setup scope.
    Shared,
}

impl TestScopePolicy {
    /// Returns true if setup scopes stay installed after their hook body.
    #[must_use]
    pub const fn keeps_setup_installed(self) -> bool {
        matches!(self, Self::Shared)
    }

    /// Returns true if test bodies get their own scope.
    #[must_use]
    pub const fn wraps_tests(self) -> bool {
        matches!(self, Self::Private)
    }
}

impl std::str::FromStr for TestScopePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            other => Err(format!("expected `private` or `shared`, got {other:?}")),
        }
    }
}

/// Configuration consumed by [`crate::intercept::Scoped`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownConfig {
    /// Test body scope policy.
    pub policy: TestScopePolicy,
}

impl TeardownConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the test scope policy.
    #[must_use]
    pub const fn policy(mut self, policy: TestScopePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Parses a TOML document, then applies environment overrides.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)
            .map_err(|e| ConfigError::File(format!("failed to parse TOML config: {e}")))?;
        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Reads and parses a TOML file, then applies environment overrides.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::File(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Apply environment variable overrides to a [`TeardownConfig`].
///
/// Only variables that are set are applied.
pub fn apply_env_overrides(config: &mut TeardownConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_POLICY) {
        config.policy = val
            .parse()
            .map_err(|message| ConfigError::InvalidEnv {
                var: ENV_POLICY,
                message,
            })?;
    }
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
