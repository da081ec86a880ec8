//! Configuration store for managing multiple versioned config types.
//!
//! This module provides the [`ConfigStore`] type, the main entry point for
//! loading, accessing and updating configuration files. The store keeps one
//! load slot per registered config type and drives each of them through
//! reading, validation, migration and persistence on first access.
//!
//! # Example
//!
//! ```rust,no_run
//! use verconf::{ConfigStore, LoadContext, ProjectLayout, workers::WorkersConfig};
//!
//! # async fn run() -> verconf::Result<()> {
//! let context = LoadContext::builder()
//!     .layout(ProjectLayout::discover(".")?)
//!     .build()?;
//! let mut store = ConfigStore::init(context);
//!
//! // Reads, validates and upgrades `.verconf/workers.toml` if needed
//! let workers = store.load::<WorkersConfig>().await?;
//! println!("{} deal networks", workers.deal_networks().count());
//! # Ok(())
//! # }
//! ```
use std::{
    any::TypeId,
    collections::HashMap,
    sync::Arc,
};

use derive_builder::{Builder, UninitializedFieldError};

use crate::{
    RegisteredConfig,
    config::{AnyConfig, ConfigData, Latest, VersionedConfig},
    error::{Error, Result},
    handle::{MutableConfig, ReadOnlyConfig},
    project::ProjectLayout,
    prompt::{NonInteractive, Prompt},
    template::TemplateContext,
};

/// Everything a load needs from the outside world.
#[derive(Clone, Builder)]
#[builder(pattern = "owned", build_fn(error = "Error"))]
pub struct LoadContext {
    /// Where config files are stored.
    layout: ProjectLayout,

    /// Answers questions raised by migrations. Without one, migrations that
    /// need an operator fail.
    #[builder(default = "Arc::new(NonInteractive) as Arc<dyn Prompt>")]
    prompt: Arc<dyn Prompt>,

    /// Values injected into default templates.
    #[builder(default)]
    template: TemplateContext,
}

impl LoadContext {
    pub fn builder() -> LoadContextBuilder {
        LoadContextBuilder::default()
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn prompt(&self) -> &dyn Prompt {
        self.prompt.as_ref()
    }

    pub fn template(&self) -> &TemplateContext {
        &self.template
    }
}

impl From<UninitializedFieldError> for Error {
    fn from(err: UninitializedFieldError) -> Self {
        Error::Settings(err.to_string())
    }
}

/// The central configuration store that manages all registered config types.
///
/// `ConfigStore` is responsible for:
///
/// - Collecting every config type registered with [`submit_config!`](crate::submit_config)
/// - Loading each config file on first access, upgrading old versions
/// - Handing out read-only and mutable handles over the latest version
/// - Remembering load failures so they are reported on every access
///
/// # Lifecycle
///
/// 1. **Initialize**: [`init`](ConfigStore::init) with a [`LoadContext`]
/// 2. **Load**: [`load`](ConfigStore::load), [`load_mut`](ConfigStore::load_mut)
///    or [`load_all`](ConfigStore::load_all)
/// 3. **Access**: [`get`](ConfigStore::get) for configs already loaded
/// 4. **Update**: [`update`](ConfigStore::update) or a [`MutableConfig`]
pub struct ConfigStore {
    context: LoadContext,

    /// Map from config type IDs to their type-erased load slots.
    configs: HashMap<TypeId, Box<dyn AnyConfig>>,
}

impl ConfigStore {
    /// Creates a store holding every config type registered with
    /// [`submit_config!`](crate::submit_config). Nothing is read yet.
    pub fn init(context: LoadContext) -> Self {
        let mut configs = HashMap::new();
        for registration in inventory::iter::<RegisteredConfig> {
            configs.insert((registration.id)(), (registration.config)());
        }

        Self { context, configs }
    }

    /// Adds a config type that was not registered globally.
    pub fn register<T: VersionedConfig>(&mut self) -> &mut Self {
        self.configs
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ConfigData::<T>::default()));
        self
    }

    pub fn context(&self) -> &LoadContext {
        &self.context
    }

    /// Type names of the registered configs, sorted.
    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.configs.values().map(|config| config.type_name()).collect();
        names.sort_unstable();
        names
    }

    /// Loads `T` if needed and returns a read-only handle.
    ///
    /// The first call reads the file, creating it from the default template
    /// when absent and migrating it when older than the latest version.
    /// Later calls reuse the loaded document, or return the original error
    /// if loading failed.
    pub async fn load<T: VersionedConfig>(&mut self) -> Result<ReadOnlyConfig<'_, T>> {
        let data = slot_mut::<T>(&mut self.configs)?;
        let loaded = data.ensure_loaded(&self.context).await?;
        Ok(ReadOnlyConfig::new(loaded))
    }

    /// Like [`load`](ConfigStore::load) but returns a handle that can change
    /// and save the document.
    pub async fn load_mut<T: VersionedConfig>(&mut self) -> Result<MutableConfig<'_, T>> {
        let data = slot_mut::<T>(&mut self.configs)?;
        let loaded = data.ensure_loaded(&self.context).await?;
        Ok(MutableConfig::new(loaded))
    }

    /// Returns a config that was already loaded.
    pub fn get<T: VersionedConfig>(&self) -> Result<&Latest<T>> {
        let data = self
            .configs
            .get(&TypeId::of::<T>())
            .and_then(|config| config.as_any().downcast_ref::<ConfigData<T>>())
            .ok_or(Error::UnregisteredConfig(T::TYPE_NAME))?;

        Ok(&data.loaded()?.document)
    }

    /// Changes a config and persists it.
    ///
    /// If the closure fails nothing is written, but changes it made before
    /// failing stay in memory.
    pub async fn update<T: VersionedConfig, F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Latest<T>) -> Result<()>,
    {
        let mut config = self.load_mut::<T>().await?;
        config.set(f).await
    }

    /// Loads every registered config in type name order.
    ///
    /// All of them are attempted. The first failure is returned.
    pub async fn load_all(&mut self) -> Result<()> {
        let mut configs: Vec<_> = self.configs.values_mut().collect();
        configs.sort_by_key(|config| config.type_name());

        let mut first_error = None;
        for config in configs {
            if let Err(err) = config.load(&self.context).await {
                first_error.get_or_insert(err);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

fn slot_mut<T: VersionedConfig>(
    configs: &mut HashMap<TypeId, Box<dyn AnyConfig>>,
) -> Result<&mut ConfigData<T>> {
    configs
        .get_mut(&TypeId::of::<T>())
        .and_then(|config| config.as_any_mut().downcast_mut::<ConfigData<T>>())
        .ok_or(Error::UnregisteredConfig(T::TYPE_NAME))
}
