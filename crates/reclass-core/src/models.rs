pub mod catalog;
pub mod dataset;
pub mod job;
pub mod legend;
pub mod matrix;
pub mod outcome;
pub mod value;

pub use catalog::{ClassCatalog, ClassEntry, PLACEHOLDER_COLOR, PLACEHOLDER_LABEL};
pub use dataset::{Attribute, DataKind, DatasetHandle, Storage};
pub use job::ReclassificationJob;
pub use legend::{Legend, LegendEntry, Rgba};
pub use matrix::ReclassMatrix;
pub use outcome::{ReclassOutcome, TaskHandle};
pub use value::ClassValue;
