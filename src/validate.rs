//! Structural validation of raw documents against one schema version.
//!
//! A [`Validator`] is compiled once from a [`SchemaDescriptor`] and then
//! reused for every document checked against that version. Checking never
//! stops at the first problem: all violations are collected so an operator
//! can fix a file in one pass.

use std::fmt;

use jsonschema::JSONSchema;

use crate::{
    error::{Error, Result},
    schema::SchemaDescriptor,
};

/// One schema violation inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON-pointer style path to the offending value, `/` for the root.
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// A compiled schema for a single version.
pub struct Validator {
    version: u32,
    compiled: JSONSchema,
}

impl Validator {
    pub fn compile(config: &'static str, descriptor: &SchemaDescriptor) -> Result<Self> {
        let compiled = JSONSchema::compile(descriptor.schema()).map_err(|err| {
            Error::invalid_definition(
                config,
                format!("schema v{} does not compile: {err}", descriptor.version()),
            )
        })?;

        Ok(Self {
            version: descriptor.version(),
            compiled,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Checks a raw document and returns every violation found.
    pub fn check(&self, document: &toml::Table) -> Result<(), Vec<Violation>> {
        let instance = serde_json::to_value(document).map_err(|err| {
            vec![Violation {
                path: "/".to_string(),
                reason: format!("cannot be represented for validation: {err}"),
            }]
        })?;

        match self.compiled.validate(&instance) {
            Ok(()) => Ok(()),
            Err(errors) => Err(errors
                .map(|err| {
                    let path = err.instance_path.to_string();
                    Violation {
                        path: if path.is_empty() { "/".to_string() } else { path },
                        reason: err.to_string(),
                    }
                })
                .collect()),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}
