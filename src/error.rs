use std::{path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::validate::Violation;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort loading, migrating or saving a config.
///
/// `Error` is `Clone` so that a config slot which failed to load can hand the
/// same failure back on every later access.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The backing store could not be written. The previous content is intact.
    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("{path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML serialization: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A document passed schema validation but could not be turned into its
    /// typed representation.
    #[error("{config} v{version}: {source}")]
    Decode {
        config: &'static str,
        version: u32,
        #[source]
        source: toml::de::Error,
    },

    /// The declared `version` does not match any registered schema.
    #[error("{config}: unknown version {found}, expected {floor}..={latest}")]
    UnknownVersion {
        config: &'static str,
        found: i64,
        floor: u32,
        latest: u32,
    },

    /// The document does not match the schema of its version. Lists every
    /// violation so the file can be fixed in one pass.
    #[error(
        "{config} does not match schema v{version} ({} problem(s)):\n{}",
        .violations.len(),
        render_violations(.violations)
    )]
    Validation {
        config: &'static str,
        version: u32,
        violations: Vec<Violation>,
    },

    #[error("{config}: migration from v{from} failed: {source}")]
    MigrationStep {
        config: &'static str,
        from: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("an answer is required but no operator prompt is available: {question}")]
    PromptUnavailable { question: String },

    #[error("`{answer}` is not one of: {}", .choices.join(", "))]
    InvalidAnswer { answer: String, choices: Vec<String> },

    /// The config type itself is inconsistent (schema gaps, missing steps...).
    #[error("invalid definition of {config}: {reason}")]
    InvalidDefinition {
        config: &'static str,
        reason: String,
    },

    /// Attempted to access a configuration type that was not registered.
    ///
    /// Register it with [`submit_config!`](crate::submit_config) or
    /// [`ConfigStore::register`](crate::ConfigStore::register).
    #[error("Config not registered: {0}")]
    UnregisteredConfig(&'static str),

    #[error("Config not loaded yet: {0}")]
    NotLoaded(&'static str),

    #[error("invalid settings: {0}")]
    Settings(String),
}

impl Error {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn invalid_definition(config: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            config,
            reason: reason.into(),
        }
    }
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("  - {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}
