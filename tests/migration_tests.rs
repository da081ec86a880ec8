//! Integration tests for migration chains.

mod common;

use std::path::Path;

use common::{non_interactive, read_config, temp_project, write_config};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use verconf::{
    ConfigStore, Error, Migration, MigrationChain, MigrationContext, NonInteractive, Result,
    Schema, SchemaRegistry, TemplateContext, Versioned, VersionedConfig, async_trait,
    render_template,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Schema)]
#[schema(version = 0)]
#[serde(deny_unknown_fields)]
struct CounterV0 {
    count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Schema)]
#[schema(version = 1)]
#[serde(deny_unknown_fields)]
struct CounterV1 {
    count: u32,
    step: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Schema)]
#[schema(version = 2)]
#[serde(deny_unknown_fields)]
struct CounterV2 {
    total: u64,
    #[schemars(range(min = 1))]
    step: u32,
}

#[derive(Debug, Clone, PartialEq, Versioned)]
enum CounterDocument {
    V0(CounterV0),
    V1(CounterV1),
    V2(CounterV2),
}

struct AddStep;

#[async_trait]
impl Migration<CounterDocument> for AddStep {
    fn from_version(&self) -> u32 {
        0
    }

    async fn migrate(
        &self,
        document: CounterDocument,
        _context: &MigrationContext<'_>,
    ) -> Result<CounterDocument> {
        match document {
            CounterDocument::V0(CounterV0 { count }) => {
                Ok(CounterDocument::V1(CounterV1 { count, step: 1 }))
            }
            other => Ok(other),
        }
    }
}

struct RenameCount {
    step: Option<u32>,
}

#[async_trait]
impl Migration<CounterDocument> for RenameCount {
    fn from_version(&self) -> u32 {
        1
    }

    async fn migrate(
        &self,
        document: CounterDocument,
        _context: &MigrationContext<'_>,
    ) -> Result<CounterDocument> {
        match document {
            CounterDocument::V1(CounterV1 { count, step }) => Ok(CounterDocument::V2(CounterV2 {
                total: u64::from(count),
                step: self.step.unwrap_or(step),
            })),
            other => Ok(other),
        }
    }
}

fn counter_template(context: &TemplateContext) -> Result<String> {
    render_template(context, "counter", &CounterV2 { total: 0, step: 1 }, &[])
}

struct CounterConfig;

impl VersionedConfig for CounterConfig {
    type Document = CounterDocument;

    const TYPE_NAME: &'static str = "counter";
    const FILE_NAME: &'static str = "counter.toml";

    fn migrations() -> Vec<Box<dyn Migration<CounterDocument>>> {
        // registration order does not matter
        vec![Box::new(RenameCount { step: None }), Box::new(AddStep)]
    }

    fn default_template(context: &TemplateContext) -> Result<String> {
        counter_template(context)
    }
}

/// Its last step produces a document that is not a valid v2.
struct ZeroStepConfig;

impl VersionedConfig for ZeroStepConfig {
    type Document = CounterDocument;

    const TYPE_NAME: &'static str = "zero-step";
    const FILE_NAME: &'static str = "counter.toml";

    fn migrations() -> Vec<Box<dyn Migration<CounterDocument>>> {
        vec![Box::new(AddStep), Box::new(RenameCount { step: Some(0) })]
    }

    fn default_template(context: &TemplateContext) -> Result<String> {
        counter_template(context)
    }
}

/// Misses the step from v1.
struct GapConfig;

impl VersionedConfig for GapConfig {
    type Document = CounterDocument;

    const TYPE_NAME: &'static str = "gap";
    const FILE_NAME: &'static str = "counter.toml";

    fn migrations() -> Vec<Box<dyn Migration<CounterDocument>>> {
        vec![Box::new(AddStep)]
    }

    fn default_template(context: &TemplateContext) -> Result<String> {
        counter_template(context)
    }
}

const FILE: &str = "counter.toml";

#[test_log::test(tokio::test)]
async fn test_migration_from_v0_to_v2() {
    let project = temp_project();
    write_config(&project, FILE, "version = 0\ncount = 41\n");

    let mut store = ConfigStore::init(non_interactive(&project));
    store.register::<CounterConfig>();

    let counter = store
        .load::<CounterConfig>()
        .await
        .expect("Failed to load config");
    assert_eq!(*counter.get(), CounterV2 { total: 41, step: 1 });

    let table: toml::Table = toml::from_str(&read_config(&project, FILE)).unwrap();
    assert_eq!(table["version"].as_integer(), Some(2));
    assert_eq!(table["total"].as_integer(), Some(41));
    assert!(table.get("count").is_none());
}

#[tokio::test]
async fn test_migration_starts_at_declared_version() {
    let project = temp_project();
    write_config(&project, FILE, "version = 1\ncount = 5\nstep = 3\n");

    let mut store = ConfigStore::init(non_interactive(&project));
    store.register::<CounterConfig>();

    let counter = store
        .load::<CounterConfig>()
        .await
        .expect("Failed to load config");
    assert_eq!(*counter.get(), CounterV2 { total: 5, step: 3 });
}

#[tokio::test]
async fn test_invalid_step_output_aborts_migration() {
    let project = temp_project();
    let contents = "version = 0\ncount = 2\n";
    write_config(&project, FILE, contents);

    let mut store = ConfigStore::init(non_interactive(&project));
    store.register::<ZeroStepConfig>();

    let err = store
        .load::<ZeroStepConfig>()
        .await
        .err()
        .expect("Migration should fail");
    let Error::Validation { version, violations, .. } = err else {
        panic!("expected a validation error, got {err}");
    };
    assert_eq!(version, 2);
    assert_eq!(violations[0].path, "/step");
    assert_eq!(read_config(&project, FILE), contents);
}

#[tokio::test]
async fn test_chain_must_cover_every_version() {
    let project = temp_project();
    let contents = "version = 2\ntotal = 1\nstep = 1\n";
    write_config(&project, FILE, contents);

    let mut store = ConfigStore::init(non_interactive(&project));
    store.register::<GapConfig>();

    let err = store
        .load::<GapConfig>()
        .await
        .err()
        .expect("Load should fail");
    assert!(matches!(err, Error::InvalidDefinition { config: "gap", .. }));
    assert_eq!(read_config(&project, FILE), contents);
}

#[tokio::test]
async fn test_latest_document_passes_through_unchanged() {
    let registry = SchemaRegistry::for_type::<CounterDocument>("counter").unwrap();
    let chain = MigrationChain::new(CounterConfig::migrations(), &registry).unwrap();
    assert_eq!(chain.len(), 2);

    let context = MigrationContext {
        config: "counter",
        path: Path::new("counter.toml"),
        prompt: &NonInteractive,
    };
    let latest = CounterDocument::V2(CounterV2 { total: 9, step: 2 });
    let migrated = chain
        .run(latest.clone(), &registry, &context)
        .await
        .unwrap();
    assert_eq!(migrated, latest);
}

#[tokio::test]
async fn test_every_valid_version_reaches_latest() {
    let registry = SchemaRegistry::for_type::<CounterDocument>("counter").unwrap();
    let chain = MigrationChain::new(CounterConfig::migrations(), &registry).unwrap();
    let context = MigrationContext {
        config: "counter",
        path: Path::new("counter.toml"),
        prompt: &NonInteractive,
    };

    let documents = [
        CounterDocument::V0(CounterV0 { count: 0 }),
        CounterDocument::V0(CounterV0 { count: u32::MAX }),
        CounterDocument::V1(CounterV1 { count: 3, step: 7 }),
        CounterDocument::V2(CounterV2 { total: 3, step: 7 }),
    ];
    for document in documents {
        let migrated = chain.run(document, &registry, &context).await.unwrap();
        assert_eq!(migrated.version(), registry.latest());
        registry.validate_document(&migrated).unwrap();
    }
}
