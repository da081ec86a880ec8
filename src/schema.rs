//! Schema versions of a config type and the registry that resolves them.
//!
//! Every historical shape of a config document is a plain struct implementing
//! [`Schema`] (usually via `#[derive(Schema)]`). A config type lists all of
//! them, oldest first, in an enum implementing [`Versioned`]: the enum is the
//! closed set of shapes a document on disk may have, and dispatch on the
//! declared version is a `match` over it.
//!
//! The `version` key is part of the document on disk but not of the schema
//! structs. [`encode_schema`] writes it first and [`decode_schema`] strips it.

use std::fmt;

use schemars::{JsonSchema, r#gen::SchemaSettings};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    error::{Error, Result},
    validate::{Validator, Violation},
};

/// Key holding the schema version in every document.
pub const VERSION_KEY: &str = "version";

/// One version of a config document's shape.
pub trait Schema: Serialize + DeserializeOwned + JsonSchema + Send + Sync + 'static {
    const VERSION: u32;
}

/// The closed set of schema versions of one config type.
///
/// Variants are ordered oldest first and the last one is [`Versioned::Latest`].
/// Use `#[derive(Versioned)]` rather than implementing this by hand.
pub trait Versioned: Sized + Send + Sync + 'static {
    type Latest: Schema;

    /// Descriptors of every version, oldest first.
    fn descriptors() -> Result<Vec<SchemaDescriptor>>;

    fn version(&self) -> u32;

    /// Decodes a raw document declared as `version`. Returns `Ok(None)` when
    /// no variant has that version.
    fn decode(version: u32, table: toml::Table) -> Result<Option<Self>, toml::de::Error>;

    fn encode(&self) -> Result<toml::Table>;

    fn into_latest(self) -> Result<Self::Latest, Self>;

    fn from_latest(latest: Self::Latest) -> Self;
}

/// Decodes a raw document into one schema version, ignoring its `version` key.
pub fn decode_schema<S: Schema>(mut table: toml::Table) -> Result<S, toml::de::Error> {
    table.remove(VERSION_KEY);
    toml::Value::Table(table).try_into()
}

/// Encodes one schema version into a raw document with `version` first.
pub fn encode_schema<S: Schema>(document: &S) -> Result<toml::Table> {
    let toml::Value::Table(fields) = toml::Value::try_from(document)? else {
        return Err(Error::Settings(format!(
            "schema v{} must serialize to a table",
            S::VERSION
        )));
    };

    let mut table = toml::Table::new();
    table.insert(
        VERSION_KEY.to_string(),
        toml::Value::Integer(i64::from(S::VERSION)),
    );
    table.extend(fields);
    Ok(table)
}

/// Documentation of one top-level field, taken from its doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDoc {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

/// The structural schema and field documentation of one version.
#[derive(Clone)]
pub struct SchemaDescriptor {
    version: u32,
    name: String,
    description: Option<String>,
    schema: Value,
    fields: Vec<FieldDoc>,
}

impl SchemaDescriptor {
    pub fn of<S: Schema>() -> Result<Self> {
        // TOML has no null, so optional fields are just not required
        let root = SchemaSettings::draft07()
            .with(|settings| settings.option_add_null_type = false)
            .into_generator()
            .into_root_schema_for::<S>();
        let mut schema = serde_json::to_value(&root).map_err(|err| {
            Error::Settings(format!("schema v{} is not representable: {err}", S::VERSION))
        })?;

        let fields = field_docs(&schema);
        let name = S::schema_name();
        let description = schema
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        pin_version(&mut schema, S::VERSION);

        Ok(Self {
            version: S::VERSION,
            name,
            description,
            schema,
            fields,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The JSON schema documents of this version are checked against.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Top-level fields in declaration order.
    pub fn fields(&self) -> &[FieldDoc] {
        &self.fields
    }
}

impl fmt::Debug for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDescriptor")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn field_docs(schema: &Value) -> Vec<FieldDoc> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, property)| FieldDoc {
                    name: name.clone(),
                    description: property
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    required: required.contains(&name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Makes `version` a required property fixed to `version`.
fn pin_version(schema: &mut Value, version: u32) {
    let Some(root) = schema.as_object_mut() else {
        return;
    };

    let properties = root
        .entry("properties")
        .or_insert_with(|| json!({}));
    if let Some(properties) = properties.as_object_mut() {
        properties.insert(
            VERSION_KEY.to_string(),
            json!({ "type": "integer", "const": version }),
        );
    }

    let required = root.entry("required").or_insert_with(|| json!([]));
    if let Some(required) = required.as_array_mut() {
        if !required.iter().any(|name| name == VERSION_KEY) {
            required.insert(0, json!(VERSION_KEY));
        }
    }
}

/// Every schema version of one config type, with compiled validators.
#[derive(Debug)]
pub struct SchemaRegistry {
    config: &'static str,
    entries: Vec<(SchemaDescriptor, Validator)>,
}

impl SchemaRegistry {
    /// Builds the registry of a config type.
    ///
    /// Descriptors must be sorted by version, without duplicates or gaps.
    pub fn new(config: &'static str, descriptors: Vec<SchemaDescriptor>) -> Result<Self> {
        let Some(first) = descriptors.first() else {
            return Err(Error::invalid_definition(config, "no schema versions"));
        };

        let floor = first.version();
        for (offset, descriptor) in descriptors.iter().enumerate() {
            let expected = u32::try_from(offset)
                .ok()
                .and_then(|offset| floor.checked_add(offset));
            if expected != Some(descriptor.version()) {
                return Err(Error::invalid_definition(
                    config,
                    format!(
                        "schema versions must be contiguous from v{floor}, found v{} at position {offset}",
                        descriptor.version()
                    ),
                ));
            }
        }

        let entries = descriptors
            .into_iter()
            .map(|descriptor| {
                let validator = Validator::compile(config, &descriptor)?;
                Ok((descriptor, validator))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { config, entries })
    }

    pub fn for_type<V: Versioned>(config: &'static str) -> Result<Self> {
        Self::new(config, V::descriptors()?)
    }

    pub fn config(&self) -> &'static str {
        self.config
    }

    pub fn floor(&self) -> u32 {
        self.entries[0].0.version()
    }

    pub fn latest(&self) -> u32 {
        self.entries[self.entries.len() - 1].0.version()
    }

    /// Resolves a declared version, which may come straight from a file.
    pub fn resolve(&self, version: i64) -> Result<u32> {
        u32::try_from(version)
            .ok()
            .filter(|version| (self.floor()..=self.latest()).contains(version))
            .ok_or(Error::UnknownVersion {
                config: self.config,
                found: version,
                floor: self.floor(),
                latest: self.latest(),
            })
    }

    pub fn descriptor(&self, version: u32) -> Result<&SchemaDescriptor> {
        self.entry(version).map(|(descriptor, _)| descriptor)
    }

    pub fn latest_descriptor(&self) -> &SchemaDescriptor {
        &self.entries[self.entries.len() - 1].0
    }

    /// Reads the declared version of a raw document.
    pub fn declared_version(&self, table: &toml::Table) -> Result<u32> {
        let violation = |reason: &str| Error::Validation {
            config: self.config,
            version: self.latest(),
            violations: vec![Violation {
                path: format!("/{VERSION_KEY}"),
                reason: reason.to_string(),
            }],
        };

        match table.get(VERSION_KEY) {
            None => Err(violation("required property is missing")),
            Some(toml::Value::Integer(version)) => self.resolve(*version),
            Some(_) => Err(violation("must be a non-negative integer")),
        }
    }

    /// Validates a raw document against the schema of `version`.
    pub fn validate(&self, version: u32, table: &toml::Table) -> Result<()> {
        let (_, validator) = self.entry(version)?;
        validator
            .check(table)
            .map_err(|violations| Error::Validation {
                config: self.config,
                version: validator.version(),
                violations,
            })
    }

    /// Encodes a typed document and validates it against its own version.
    pub fn validate_document<V: Versioned>(&self, document: &V) -> Result<toml::Table> {
        let table = document.encode()?;
        self.validate(document.version(), &table)?;
        Ok(table)
    }

    fn entry(&self, version: u32) -> Result<&(SchemaDescriptor, Validator)> {
        let index = version
            .checked_sub(self.floor())
            .and_then(|offset| usize::try_from(offset).ok());
        index
            .and_then(|index| self.entries.get(index))
            .ok_or(Error::UnknownVersion {
                config: self.config,
                found: i64::from(version),
                floor: self.floor(),
                latest: self.latest(),
            })
    }
}
