//! Kind command implementation

use crate::cli::SourceArgs;
use crate::commands::GlobalOptions;
use crate::config_loader::{build_engine, load_config, source_handle};
use crate::output::OutputWriter;
use crate::output_types::KindOutput;
use anyhow::Result;
use reclass_core::models::ReclassificationJob;

pub fn execute(args: SourceArgs, globals: &GlobalOptions, output: &OutputWriter) -> Result<()> {
    let config = load_config(globals.config.as_deref())?;
    let engine = build_engine(&config, globals.remote)?;

    let source = source_handle(&args.source, globals.remote);
    let mut job = ReclassificationJob::new().with_source(source.clone());
    let kind = engine.detect_kind(&mut job)?;

    if output.is_json() {
        output.result(KindOutput {
            source: source.to_string(),
            storage: source.storage(),
            kind,
        })?;
    } else {
        output.kv("Source", &source);
        output.kv("Storage", source.storage());
        output.kv("Kind", kind);
    }

    Ok(())
}
