//! Default documents written when a config file does not exist yet.
//!
//! Templates are plain TOML with explanatory comments. [`render_template`]
//! builds one from a schema version: a header naming the product, then every
//! top-level field preceded by its doc comment. Optional fields without a
//! value are written as commented examples so the operator can see their
//! shape without the file declaring them.

use derive_builder::Builder;

use crate::{
    error::Result,
    schema::{Schema, SchemaDescriptor, VERSION_KEY, encode_schema},
};

/// Read-only values a template may mention.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), default)]
pub struct TemplateContext {
    pub product_name: String,
    pub cli_name: String,
    #[builder(setter(into, strip_option))]
    pub docs_url: Option<String>,
}

impl TemplateContext {
    pub fn builder() -> TemplateContextBuilder {
        TemplateContextBuilder::default()
    }
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            product_name: "verconf".to_string(),
            cli_name: "verconf".to_string(),
            docs_url: None,
        }
    }
}

/// Renders a commented default document for schema `S`.
///
/// `examples` maps top-level field names to TOML snippets shown, commented
/// out, when `document` has no value for that field.
pub fn render_template<S: Schema>(
    context: &TemplateContext,
    config: &str,
    document: &S,
    examples: &[(&str, &str)],
) -> Result<String> {
    let descriptor = SchemaDescriptor::of::<S>()?;
    let table = encode_schema(document)?;

    let mut out = String::new();
    push_comment(
        &mut out,
        &format!("{} {config} config", context.product_name),
    );
    if let Some(description) = descriptor.description() {
        push_comment(&mut out, description);
    }
    push_comment(
        &mut out,
        &format!(
            "Managed by `{}`. Files written by older versions are upgraded automatically.",
            context.cli_name
        ),
    );
    if let Some(url) = &context.docs_url {
        push_comment(&mut out, &format!("Documentation: {url}"));
    }
    out.push('\n');

    push_comment(
        &mut out,
        "Schema version of this file. It is updated by migrations, do not change it by hand.",
    );
    push_entry(&mut out, VERSION_KEY, &table)?;

    // plain values must come before the first [table] header
    let (scalars, sections): (Vec<_>, Vec<_>) = descriptor
        .fields()
        .iter()
        .partition(|field| table.get(&field.name).is_some_and(|value| !is_section(value)));

    for field in scalars.into_iter().chain(sections) {
        out.push('\n');
        if let Some(description) = &field.description {
            push_comment(&mut out, description);
        }

        if table.contains_key(&field.name) {
            push_entry(&mut out, &field.name, &table)?;
        } else if let Some((_, example)) = examples.iter().find(|(name, _)| *name == field.name) {
            push_comment(&mut out, "Example:");
            push_comment(&mut out, example.trim_end());
        }
    }

    Ok(out)
}

fn is_section(value: &toml::Value) -> bool {
    match value {
        toml::Value::Table(_) => true,
        toml::Value::Array(items) => {
            !items.is_empty() && items.iter().all(|item| item.is_table())
        }
        _ => false,
    }
}

fn push_comment(out: &mut String, text: &str) {
    for line in text.lines() {
        if line.is_empty() {
            out.push_str("#\n");
        } else {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
}

fn push_entry(out: &mut String, key: &str, table: &toml::Table) -> Result<()> {
    let Some(value) = table.get(key) else {
        return Ok(());
    };

    let mut single = toml::Table::new();
    single.insert(key.to_string(), value.clone());
    out.push_str(&toml::to_string(&single)?);
    Ok(())
}
