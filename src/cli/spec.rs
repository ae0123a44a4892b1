use anyhow::{Context, Result};

use crate::classify::{FieldSpec, ResponseSchema};
use crate::store::MetadataStore;

pub fn add(
    store: &MetadataStore,
    format: String,
    instruction: String,
    fields: Vec<String>,
) -> Result<()> {
    if fields.is_empty() {
        anyhow::bail!("at least one --field name:type is required");
    }
    let fields = fields
        .iter()
        .map(|f| f.parse::<FieldSpec>())
        .collect::<crate::Result<Vec<_>>>()
        .context("invalid field definition")?;

    let schema = ResponseSchema::new(format, fields);
    let id = store.create_detection_spec(&instruction, &schema)?;
    println!("Detection spec {} created with format '{}'", id, schema.name);
    Ok(())
}

pub fn list(store: &MetadataStore) -> Result<()> {
    let specs = store.list_detection_specs()?;
    if specs.is_empty() {
        println!("No detection specs found.");
        return Ok(());
    }

    for spec in specs {
        println!("[{}] {}", spec.id, spec.schema.name);
        println!("    {}", super::truncate(&spec.instruction, 100));
        for field in &spec.schema.fields {
            println!("    - {}: {}", field.name, field.field_type);
        }
    }
    Ok(())
}
