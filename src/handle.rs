//! Handles over a loaded config document.

use std::{ops::Deref, path::Path};

use crate::{
    config::{Latest, Loaded, VersionedConfig},
    error::Result,
};

/// Read access to a config at its latest version.
pub struct ReadOnlyConfig<'a, T: VersionedConfig> {
    loaded: &'a Loaded<T>,
}

impl<'a, T: VersionedConfig> ReadOnlyConfig<'a, T> {
    pub(crate) fn new(loaded: &'a Loaded<T>) -> Self {
        Self { loaded }
    }

    pub fn get(&self) -> &'a Latest<T> {
        &self.loaded.document
    }

    /// File the document was loaded from.
    pub fn path(&self) -> &'a Path {
        &self.loaded.path
    }
}

impl<T: VersionedConfig> Deref for ReadOnlyConfig<'_, T> {
    type Target = Latest<T>;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

/// Read and write access to a config at its latest version.
///
/// Edits stay in memory until [`save`](MutableConfig::save) or
/// [`set`](MutableConfig::set) writes them.
pub struct MutableConfig<'a, T: VersionedConfig> {
    loaded: &'a mut Loaded<T>,
}

impl<'a, T: VersionedConfig> MutableConfig<'a, T> {
    pub(crate) fn new(loaded: &'a mut Loaded<T>) -> Self {
        Self { loaded }
    }

    pub fn get(&self) -> &Latest<T> {
        &self.loaded.document
    }

    pub fn get_mut(&mut self) -> &mut Latest<T> {
        &mut self.loaded.document
    }

    pub fn path(&self) -> &Path {
        &self.loaded.path
    }

    /// Applies `f` and saves the result. Nothing is written if `f` fails.
    pub async fn set<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Latest<T>) -> Result<()>,
    {
        f(&mut self.loaded.document)?;
        self.save().await
    }

    /// Validates the document and writes it back to its file.
    ///
    /// The comment block at the top of the file is kept. Comments further
    /// down are not.
    pub async fn save(&self) -> Result<()> {
        self.loaded.persist().await
    }
}

impl<T: VersionedConfig> Deref for MutableConfig<'_, T> {
    type Target = Latest<T>;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}
