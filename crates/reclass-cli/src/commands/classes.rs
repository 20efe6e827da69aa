//! Classes command implementation

use crate::cli::ClassesArgs;
use crate::commands::GlobalOptions;
use crate::config_loader::{build_engine, load_config, source_handle};
use crate::output::OutputWriter;
use crate::output_types::{ClassRow, ClassesWrittenOutput};
use anyhow::{Context, Result};
use reclass_core::catalog::write_catalog;
use reclass_core::models::{Attribute, ReclassificationJob};

pub fn execute(args: ClassesArgs, globals: &GlobalOptions, output: &OutputWriter) -> Result<()> {
    let config = load_config(globals.config.as_deref())?;
    let engine = build_engine(&config, globals.remote)?;

    let mut job = ReclassificationJob::new().with_source(source_handle(&args.source, globals.remote));
    let attribute = engine.select_attribute(&mut job, &Attribute::parse(&args.attribute))?;
    let catalog = engine
        .discover_classes(&job)
        .with_context(|| format!("Failed to read the classes of {}", args.source))?;

    if let Some(path) = args.output {
        write_catalog(&path, &catalog)
            .with_context(|| format!("Failed to write class table {}", path.display()))?;

        if output.is_json() {
            output.result(ClassesWrittenOutput {
                path: path.display().to_string(),
                class_count: catalog.len(),
            })?;
        } else {
            output.success(format!(
                "Wrote {} classes of '{}' to {}",
                catalog.len(),
                attribute,
                path.display()
            ));
            output.info("Edit the labels and colors, then pass the table to 'reclass run --classes'");
        }
        return Ok(());
    }

    if !output.is_json() {
        output.section(format!("Classes of '{}'", attribute));
    }
    let rows: Vec<ClassRow> = catalog.iter().map(ClassRow::from).collect();
    output.table(rows)
}
