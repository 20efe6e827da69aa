//! Class tables and transfer matrices stored as CSV
//!
//! Class tables are headerless with three columns: `code`, `label`,
//! `color`. Matrices carry a `src,dst` header so that files exported by
//! other tools (e.g. with a leading index column) stay readable.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReclassError, Result};
use crate::models::{ClassCatalog, ClassEntry, ClassValue, ReclassMatrix};

/// Load a class table.
///
/// Rows are read positionally; a code appearing on several rows keeps the
/// last row, since each row simply overwrites the catalog entry.
pub fn load_catalog(path: &Path) -> Result<ClassCatalog> {
    if !path.is_file() {
        return Err(ReclassError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut catalog = ClassCatalog::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != 3 {
            return Err(ReclassError::InvalidCatalog {
                path: path.to_path_buf(),
                line,
                reason: format!("expected 3 columns (code, label, color), found {}", record.len()),
            });
        }

        let code = &record[0];
        if code.is_empty() {
            return Err(ReclassError::InvalidCatalog {
                path: path.to_path_buf(),
                line,
                reason: "empty class code".to_string(),
            });
        }

        if let Some(previous) = catalog.insert(ClassEntry::new(ClassValue::parse(code), &record[1], &record[2])) {
            tracing::debug!(code = %previous.code, line, "Class code repeated, keeping the later row");
        }
    }

    Ok(catalog)
}

/// Write a class table in the format read by [`load_catalog`]
pub fn write_catalog(path: &Path, catalog: &ClassCatalog) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    for entry in catalog.iter() {
        writer.write_record([entry.code.to_string(), entry.label.clone(), entry.color.clone()])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct MatrixRow {
    src: String,
    dst: i64,
}

/// Save the transfer matrix. Nothing is written for an empty matrix.
pub fn save_matrix(path: &Path, matrix: &ReclassMatrix) -> Result<()> {
    if matrix.is_empty() {
        return Ok(());
    }

    let mut writer = csv::Writer::from_path(path)?;
    for (src, dst) in matrix.iter() {
        writer.serialize(MatrixRow {
            src: src.to_string(),
            dst,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a transfer matrix; each source code may appear only once
pub fn load_matrix(path: &Path) -> Result<ReclassMatrix> {
    if !path.is_file() {
        return Err(ReclassError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

    let mut matrix = ReclassMatrix::new();
    for result in reader.deserialize() {
        let row: MatrixRow = result?;
        let src = ClassValue::parse(&row.src);
        if matrix.contains_key(&src) {
            return Err(ReclassError::DuplicateKey {
                key: src.to_string(),
                context: format!("matrix {}", path.display()),
            });
        }
        matrix.insert(src, row.dst);
    }

    Ok(matrix)
}
