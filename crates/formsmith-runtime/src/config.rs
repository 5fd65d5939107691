#![forbid(unsafe_code)]

//! Designer configuration.
//!
//! [`DesignerConfig`] collects the knobs of a [`Designer`](crate::Designer)
//! session. With the `config-files` feature it can be loaded from TOML or
//! JSON; every field is optional in the file.
//!
//! ```toml
//! form_name = "Customer intake"
//! verify_invariants = true
//!
//! [history]
//! max_depth = 500
//! ```
//!
//! ```rust,ignore
//! let config = DesignerConfig::from_toml_file("designer.toml")?;
//! let designer = Designer::try_new(config)?;
//! ```

#[cfg(feature = "config-files")]
use std::path::Path;

use formsmith_model::DEFAULT_FORM_NAME;
use serde::{Deserialize, Serialize};

use crate::undo::HistoryConfig;

/// Configuration for one designer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignerConfig {
    /// Name given to the initial empty document.
    pub form_name: String,

    pub history: HistoryConfig,

    /// Run a full structural check after every applied command and reject
    /// the commit if it fails. O(n) per commit.
    pub verify_invariants: bool,

    /// Drop ids of deleted nodes from the live selection after each commit.
    pub prune_selection: bool,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            form_name: DEFAULT_FORM_NAME.to_owned(),
            history: HistoryConfig::default(),
            verify_invariants: cfg!(debug_assertions),
            prune_selection: true,
        }
    }
}

impl DesignerConfig {
    #[must_use]
    pub fn with_form_name(mut self, form_name: impl Into<String>) -> Self {
        self.form_name = form_name.into();
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.history.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_verify_invariants(mut self, verify: bool) -> Self {
        self.verify_invariants = verify;
        self
    }

    #[must_use]
    pub fn with_prune_selection(mut self, prune: bool) -> Self {
        self.prune_selection = prune;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-files")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-files")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-files")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Check every field is usable.
    ///
    /// Returns a list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.form_name.trim().is_empty() {
            errors.push("form_name must not be blank".to_owned());
        }
        if self.history.max_depth == 0 {
            errors.push("history.max_depth must be at least 1".to_owned());
        }
        errors
    }
}

/// Errors that can occur when loading or applying a designer configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-files")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-files")]
    Json(serde_json::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-files")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-files")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
