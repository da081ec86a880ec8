use std::{
    any::{Any, TypeId},
    path::PathBuf,
};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    atomic::{AtomicFile, comment_header},
    error::{Error, Result},
    migration::{Migration, MigrationChain, MigrationContext},
    project::ProjectLayout,
    schema::{SchemaRegistry, Versioned, encode_schema},
    store::LoadContext,
    template::TemplateContext,
};

/// A config type whose file may have been written by any of its versions.
///
/// Implementors list their schema versions through [`Document`](Self::Document),
/// provide one migration step per version boundary, and a template for the
/// file created when none exists.
pub trait VersionedConfig: Send + Sync + 'static {
    type Document: Versioned;

    const TYPE_NAME: &'static str;
    const FILE_NAME: &'static str;

    fn migrations() -> Vec<Box<dyn Migration<Self::Document>>>;

    /// Commented TOML written when the file does not exist.
    fn default_template(context: &TemplateContext) -> Result<String>;

    fn location(layout: &ProjectLayout) -> PathBuf {
        layout.state_dir().join(Self::FILE_NAME)
    }
}

/// The latest schema version of a config type.
pub type Latest<T> = <<T as VersionedConfig>::Document as Versioned>::Latest;

/// A config document upgraded to the latest version.
pub struct Loaded<T: VersionedConfig> {
    pub(crate) path: PathBuf,
    pub(crate) document: Latest<T>,
    /// Comment block re-emitted above the data on save.
    pub(crate) header: String,
    pub(crate) registry: SchemaRegistry,
}

impl<T: VersionedConfig> Loaded<T> {
    /// Validates the in-memory document and writes it back.
    pub(crate) async fn persist(&self) -> Result<()> {
        let table = encode_schema(&self.document)?;
        self.registry.validate(self.registry.latest(), &table)?;

        let contents = format!("{}{}", self.header, toml::to_string_pretty(&table)?);
        AtomicFile::new(&self.path).write(contents).await
    }
}

/// Loads a config document, creating or upgrading its file as needed.
///
/// The file is written at most once, after the document validated at the
/// latest version. Any failure before that leaves it untouched.
pub async fn load_document<T: VersionedConfig>(context: &LoadContext) -> Result<Loaded<T>> {
    let registry = SchemaRegistry::for_type::<T::Document>(T::TYPE_NAME)?;
    let chain = MigrationChain::new(T::migrations(), &registry)?;

    let file = AtomicFile::new(T::location(context.layout()));
    let path = file.path().to_path_buf();

    let (contents, created) = match file.read().await? {
        Some(contents) => (contents, false),
        None => (T::default_template(context.template())?, true),
    };

    let table: toml::Table = toml::from_str(&contents).map_err(|source| Error::Parse {
        path: path.clone(),
        source,
    })?;

    let version = registry.declared_version(&table)?;
    registry.validate(version, &table)?;

    let document = T::Document::decode(version, table)
        .map_err(|source| Error::Decode {
            config: T::TYPE_NAME,
            version,
            source,
        })?
        .ok_or(Error::UnknownVersion {
            config: T::TYPE_NAME,
            found: i64::from(version),
            floor: registry.floor(),
            latest: registry.latest(),
        })?;

    let header = comment_header(&contents);
    let document = if version < registry.latest() {
        info!(
            config = T::TYPE_NAME,
            path = %path.display(),
            from = version,
            to = registry.latest(),
            "upgrading config"
        );

        let migration = MigrationContext {
            config: T::TYPE_NAME,
            path: &path,
            prompt: context.prompt(),
        };
        let document = chain.run(document, &registry, &migration).await?;

        let table = registry.validate_document(&document)?;
        file.write(format!("{header}{}", toml::to_string_pretty(&table)?))
            .await?;
        info!(config = T::TYPE_NAME, path = %path.display(), "config upgraded");
        document
    } else {
        if created {
            file.write(contents).await?;
            info!(config = T::TYPE_NAME, path = %path.display(), "created default config");
        }
        document
    };

    let document = document.into_latest().map_err(|document| {
        Error::invalid_definition(
            T::TYPE_NAME,
            format!("migrations stopped at v{}", document.version()),
        )
    })?;

    Ok(Loaded {
        path,
        document,
        header,
        registry,
    })
}

enum Slot<T: VersionedConfig> {
    Uninitialized,
    Loaded(Loaded<T>),
    Failed(Error),
}

/// Load state of one config type inside a [`ConfigStore`](crate::ConfigStore).
///
/// The first access loads the document. A failed load is remembered and
/// every later access returns the same error.
pub struct ConfigData<T: VersionedConfig>(Slot<T>);

impl<T: VersionedConfig> ConfigData<T> {
    pub(crate) async fn ensure_loaded(&mut self, context: &LoadContext) -> Result<&mut Loaded<T>> {
        if let Slot::Uninitialized = self.0 {
            self.0 = match load_document::<T>(context).await {
                Ok(loaded) => Slot::Loaded(loaded),
                Err(err) => {
                    warn!(config = T::TYPE_NAME, error = %err, "config failed to load");
                    Slot::Failed(err)
                }
            };
        }

        match &mut self.0 {
            Slot::Loaded(loaded) => Ok(loaded),
            Slot::Failed(err) => Err(err.clone()),
            Slot::Uninitialized => Err(Error::NotLoaded(T::TYPE_NAME)),
        }
    }

    pub(crate) fn loaded(&self) -> Result<&Loaded<T>> {
        match &self.0 {
            Slot::Loaded(loaded) => Ok(loaded),
            Slot::Failed(err) => Err(err.clone()),
            Slot::Uninitialized => Err(Error::NotLoaded(T::TYPE_NAME)),
        }
    }
}

impl<T: VersionedConfig> Default for ConfigData<T> {
    fn default() -> Self {
        ConfigData(Slot::Uninitialized)
    }
}

#[async_trait]
pub trait AnyConfig: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    async fn load(&mut self, context: &LoadContext) -> Result<()>;
}

#[async_trait]
impl<T: VersionedConfig> AnyConfig for ConfigData<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    async fn load(&mut self, context: &LoadContext) -> Result<()> {
        self.ensure_loaded(context).await.map(|_| ())
    }
}

pub struct RegisteredConfig {
    pub config: fn() -> Box<dyn AnyConfig>,
    pub id: fn() -> TypeId,
}

impl RegisteredConfig {
    pub const fn new<T: VersionedConfig>() -> Self {
        Self {
            config: || Box::new(ConfigData::<T>::default()),
            id: || TypeId::of::<T>(),
        }
    }
}

inventory::collect!(RegisteredConfig);

/// Registers a [`VersionedConfig`] with every [`ConfigStore`](crate::ConfigStore).
#[macro_export]
macro_rules! submit_config {
    ($config_type:ty) => {
        $crate::inventory::submit! {
            $crate::RegisteredConfig::new::<$config_type>()
        }
    };
}
