//! Run command implementation

use crate::cli::RunArgs;
use crate::commands::GlobalOptions;
use crate::config_loader::{build_engine, load_config_with_overrides, source_handle};
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::output::OutputWriter;
use crate::output_types::RunOutput;
use anyhow::{Context, Result};
use reclass_core::catalog::{load_catalog, load_matrix};
use reclass_core::config::{parse_export_scale, parse_output_field, CliConfigOverrides};
use reclass_core::models::{Attribute, ReclassOutcome, ReclassificationJob};

pub fn execute(args: RunArgs, globals: &GlobalOptions, output: &OutputWriter) -> Result<()> {
    let output_field = args.output_field.as_deref().map(parse_output_field).transpose()?;
    let export_scale = args.scale.map(parse_export_scale).transpose()?;
    let config = load_config_with_overrides(
        globals.config.as_deref(),
        CliConfigOverrides {
            destination_dir: args.dst_dir.clone(),
            output_field,
            export_scale,
        },
    )?;

    // Tables are checked before the source is touched
    let destination_catalog = load_catalog(&args.classes)
        .with_context(|| format!("Failed to load class table {}", args.classes.display()))?;
    let matrix = load_matrix(&args.matrix)
        .with_context(|| format!("Failed to load matrix {}", args.matrix.display()))?;

    let engine = build_engine(&config, globals.remote)?;
    let mut job = ReclassificationJob::new().with_source(source_handle(&args.source, globals.remote));
    if !globals.remote {
        job.destination = Some(config.destination_dir.value.clone());
    }
    job.output_field = config.output_field.value.clone();

    let attribute = engine.select_attribute(&mut job, &Attribute::parse(&args.attribute))?;
    job.destination_catalog = destination_catalog;
    job.matrix = matrix;

    if args.dry_run {
        let location = engine.planned_output(&mut job)?;
        let action = if globals.remote {
            PlannedAction::new(ActionType::SubmitExport, format!("Export to asset {}", location))
                .with_detail(format!("Scale: {} m", config.export_scale.value))
        } else {
            PlannedAction::new(ActionType::WriteFile, format!("Write {}", location))
        };
        let action = action
            .with_detail(format!("Attribute: {}", attribute))
            .with_detail(format!("Matrix rows: {}", job.matrix.len()))
            .with_detail(format!("Destination classes: {}", job.destination_catalog.len()));
        return display_planned_actions(output, &[action]);
    }

    let outcome = engine
        .reclassify(&mut job)
        .with_context(|| format!("Failed to reclassify {}", args.source))?;

    if output.is_json() {
        return output.result(RunOutput {
            source: args.source,
            attribute: attribute.to_string(),
            class_count: job.destination_catalog.len(),
            outcome,
        });
    }

    match outcome {
        ReclassOutcome::Written { path, legend } => {
            output.success(format!("Reclassified '{}' into {}", attribute, path.display()));
            if let Some(legend) = legend {
                output.kv("Legend", legend.display());
            }
        }
        ReclassOutcome::Submitted { asset_id, task } => {
            output.success(format!("Export of {} submitted", asset_id));
            output.kv("Task", &task.id);
            output.info("The export runs on Earth Engine; its progress is not tracked here");
        }
    }

    Ok(())
}
