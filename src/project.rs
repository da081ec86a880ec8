//! Where config files live.
//!
//! A project is a directory containing a marker file. Config files are kept
//! in a state directory inside it (`<root>/.verconf/` by default).

use std::{
    env,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// Overrides project discovery when set.
pub const PROJECT_DIR_ENV: &str = "VERCONF_PROJECT_DIR";

/// File that marks a directory as a project root.
pub const PROJECT_MARKER: &str = "verconf.toml";

pub const DEFAULT_STATE_DIR: &str = ".verconf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    state_dir: String,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state_dir: DEFAULT_STATE_DIR.to_string(),
        }
    }

    pub fn with_state_dir(mut self, state_dir: impl Into<String>) -> Self {
        self.state_dir = state_dir.into();
        self
    }

    /// Finds the project root: [`PROJECT_DIR_ENV`] if set, otherwise the
    /// closest ancestor of `start` (inclusive) holding [`PROJECT_MARKER`].
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        if let Some(root) = env::var_os(PROJECT_DIR_ENV).filter(|root| !root.is_empty()) {
            return Ok(Self::new(root));
        }

        Self::find_marker(start.as_ref())
    }

    /// Walks up from `start` looking for [`PROJECT_MARKER`].
    pub fn find_marker(start: &Path) -> Result<Self> {
        start
            .ancestors()
            .find(|dir| dir.join(PROJECT_MARKER).is_file())
            .map(Self::new)
            .ok_or_else(|| {
                Error::Settings(format!(
                    "no {PROJECT_MARKER} found in {} or any parent directory",
                    start.display()
                ))
            })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory config files are stored in.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(&self.state_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_closest_marker() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("a").join(PROJECT_MARKER), "").unwrap();

        let layout = ProjectLayout::find_marker(&nested).unwrap();
        assert_eq!(layout.root(), dir.path().join("a"));
        assert_eq!(layout.state_dir(), dir.path().join("a/.verconf"));
    }

    #[test]
    fn missing_marker_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ProjectLayout::find_marker(dir.path()),
            Err(Error::Settings(_))
        ));
    }

    #[test]
    fn custom_state_dir() {
        let layout = ProjectLayout::new("/srv/app").with_state_dir(".state");
        assert_eq!(layout.state_dir(), PathBuf::from("/srv/app/.state"));
    }
}
