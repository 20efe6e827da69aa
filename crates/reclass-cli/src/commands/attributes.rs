//! Attributes command implementation

use crate::cli::SourceArgs;
use crate::commands::GlobalOptions;
use crate::config_loader::{build_engine, load_config, source_handle};
use crate::output::OutputWriter;
use crate::output_types::AttributeRow;
use anyhow::{Context, Result};
use reclass_core::models::{DataKind, ReclassificationJob};

pub fn execute(args: SourceArgs, globals: &GlobalOptions, output: &OutputWriter) -> Result<()> {
    let config = load_config(globals.config.as_deref())?;
    let engine = build_engine(&config, globals.remote)?;

    let mut job = ReclassificationJob::new().with_source(source_handle(&args.source, globals.remote));
    let attributes = engine
        .list_attributes(&mut job)
        .with_context(|| format!("Failed to list attributes of {}", args.source))?;

    if !output.is_json() {
        let title = match job.kind() {
            Some(DataKind::Raster) => "Bands",
            _ => "Properties",
        };
        output.section(title);
    }

    let rows: Vec<AttributeRow> = attributes
        .iter()
        .map(|a| AttributeRow { attribute: a.to_string() })
        .collect();
    output.table(rows)
}
