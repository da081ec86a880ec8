use std::{hash::Hash, path::Path};

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    error::{Error, Result},
    prompt::{Choice, Prompt, ask},
    schema::{SchemaRegistry, Versioned},
};

/// What a migration step may use besides the document itself.
pub struct MigrationContext<'a> {
    pub config: &'static str,
    /// Location of the document being migrated, for operator questions.
    pub path: &'a Path,
    pub prompt: &'a dyn Prompt,
}

/// One step of a config type's migration chain.
///
/// A step accepts documents of version [`from_version`](Migration::from_version)
/// and returns a document of a later version, usually the next one.
#[async_trait]
pub trait Migration<D: Versioned>: Send + Sync {
    fn from_version(&self) -> u32;

    async fn migrate(&self, document: D, context: &MigrationContext<'_>) -> Result<D>;
}

/// The ordered migration steps of one config type.
pub struct MigrationChain<D: Versioned> {
    steps: Vec<Box<dyn Migration<D>>>,
}

impl<D: Versioned> MigrationChain<D> {
    /// Orders `steps` and checks that every version below the latest one has
    /// exactly one step starting at it.
    pub fn new(mut steps: Vec<Box<dyn Migration<D>>>, registry: &SchemaRegistry) -> Result<Self> {
        steps.sort_by_key(|step| step.from_version());

        let expected: Vec<u32> = (registry.floor()..registry.latest()).collect();
        let found: Vec<u32> = steps.iter().map(|step| step.from_version()).collect();
        if expected != found {
            return Err(Error::invalid_definition(
                registry.config(),
                format!("migration steps start at {found:?}, expected one per version {expected:?}"),
            ));
        }

        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step from the document's version up to the latest one.
    ///
    /// Input and output of each step are validated against their schemas. An
    /// already latest document is returned untouched.
    pub async fn run(
        &self,
        mut document: D,
        registry: &SchemaRegistry,
        context: &MigrationContext<'_>,
    ) -> Result<D> {
        while document.version() < registry.latest() {
            let from = document.version();
            let step_failed = |source: Error| Error::MigrationStep {
                config: context.config,
                from,
                source: Box::new(source),
            };

            let step = self
                .steps
                .iter()
                .find(|step| step.from_version() == from)
                .ok_or_else(|| {
                    Error::invalid_definition(context.config, format!("no migration from v{from}"))
                })?;

            registry.validate_document(&document)?;

            debug!(config = context.config, from, "running migration step");
            let next = step
                .migrate(document, context)
                .await
                .map_err(step_failed)?;

            let to = next.version();
            if to <= from {
                return Err(step_failed(Error::invalid_definition(
                    context.config,
                    format!("step from v{from} produced v{to}"),
                )));
            }

            registry.validate_document(&next)?;
            debug!(config = context.config, from, to, "migration step done");
            document = next;
        }

        Ok(document)
    }
}

/// How a legacy record maps onto a category.
pub enum Resolution<C> {
    /// A legacy field determines the category.
    Known(C),
    /// Only the operator knows.
    Ask {
        question: String,
        suggested: Option<C>,
    },
}

/// Splits a flat `name -> record` map into `category -> name -> record`.
///
/// Records are visited in map order. `classify` decides for each record
/// whether its category is known or must be asked. Categories appear in the
/// order they are first assigned and none of them is empty.
pub async fn partition_records<R, C, F>(
    records: IndexMap<String, R>,
    prompt: &dyn Prompt,
    mut classify: F,
) -> Result<IndexMap<C, IndexMap<String, R>>>
where
    R: Send,
    C: Choice + Hash,
    F: FnMut(&str, &R) -> Resolution<C> + Send,
{
    let mut partitioned: IndexMap<C, IndexMap<String, R>> = IndexMap::new();

    for (name, record) in records {
        let category = match classify(&name, &record) {
            Resolution::Known(category) => {
                debug!(record = %name, category = category.as_str(), "category resolved from legacy field");
                category
            }
            Resolution::Ask {
                question,
                suggested,
            } => ask(prompt, question, suggested).await?,
        };

        partitioned
            .entry(category)
            .or_default()
            .insert(name, record);
    }

    Ok(partitioned)
}
