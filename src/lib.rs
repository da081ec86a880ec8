extern crate self as verconf;

pub mod atomic;
pub mod config;
pub mod error;
pub mod handle;
pub mod migration;
pub mod project;
pub mod prompt;
pub mod schema;
pub mod store;
pub mod template;
pub mod validate;
pub mod workers;

pub use config::{Latest, RegisteredConfig, VersionedConfig};
pub use error::{Error, Result};
pub use handle::{MutableConfig, ReadOnlyConfig};
pub use migration::{Migration, MigrationChain, MigrationContext, Resolution, partition_records};
pub use project::ProjectLayout;
pub use prompt::{AcceptDefaults, Choice, NonInteractive, Prompt, Question};
pub use schema::{Schema, SchemaDescriptor, SchemaRegistry, Versioned};
pub use store::{ConfigStore, LoadContext};
pub use template::{TemplateContext, render_template};

// re-export derive macros
pub use verconf_macros::{Schema, Versioned};

pub use async_trait::async_trait;
#[doc(hidden)]
pub use inventory;
pub use toml;
