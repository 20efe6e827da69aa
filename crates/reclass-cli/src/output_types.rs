use reclass_core::models::{ClassEntry, DataKind, ReclassOutcome, Storage};
use serde::Serialize;
use tabled::Tabled;

/// Output for kind command
#[derive(Debug, Serialize)]
pub struct KindOutput {
    pub source: String,
    pub storage: Storage,
    pub kind: DataKind,
}

/// One row of the attributes command
#[derive(Debug, Serialize, Tabled)]
pub struct AttributeRow {
    #[tabled(rename = "Attribute")]
    pub attribute: String,
}

/// One row of the classes command
#[derive(Debug, Serialize, Tabled)]
pub struct ClassRow {
    #[tabled(rename = "Code")]
    pub code: String,
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Color")]
    pub color: String,
}

impl From<&ClassEntry> for ClassRow {
    fn from(entry: &ClassEntry) -> Self {
        Self {
            code: entry.code.to_string(),
            label: entry.label.clone(),
            color: entry.color.clone(),
        }
    }
}

/// Output for classes command when a class table was written
#[derive(Debug, Serialize)]
pub struct ClassesWrittenOutput {
    pub path: String,
    pub class_count: usize,
}

/// Output for run command
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub source: String,
    pub attribute: String,
    pub class_count: usize,
    pub outcome: ReclassOutcome,
}

/// One row of the config command
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}
