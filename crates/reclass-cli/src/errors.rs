use console::style;
use reclass_core::config::TOKEN_ENV;
use reclass_core::ReclassError;
use reclass_remote::EarthEngineError;
use std::fmt;
use std::path::Path;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    fn with_context_if_missing(self, error: &anyhow::Error) -> Self {
        if self.context.is_some() {
            return self;
        }
        self.with_context(format!("Error: {:#}", error))
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn source_not_found(path: &Path) -> CliError {
    CliError::new("Source file not found")
        .with_context(format!("The specified source does not exist.\n\nPath: {}", path.display()))
        .with_suggestion("Check the file path and try again")
        .with_suggestion("For Earth Engine assets, pass --remote")
        .with_help("Run: reclass kind --help")
}

pub fn unrecognized_source(detail: &str) -> CliError {
    CliError::new("Cannot tell whether the source is a raster or a vector")
        .with_context(format!("Error: {}", detail))
        .with_suggestion("Local sources must be .tif, .tiff, .vrt, .geojson or .shp")
        .with_suggestion("Remote sources must be IMAGE or TABLE assets")
}

pub fn missing_token() -> CliError {
    CliError::new("Earth Engine access token missing")
        .with_context(format!("Remote sources need an OAuth access token in {}.", TOKEN_ENV))
        .with_suggestion(format!(
            "Export a token: export {}=\"$(gcloud auth print-access-token)\"",
            TOKEN_ENV
        ))
        .with_suggestion("Or drop --remote to work on local files")
}

pub fn attribute_not_found(attribute: &str, available: &[String]) -> CliError {
    CliError::new(format!("Attribute '{}' not found", attribute))
        .with_context(format!("Available attributes: {}", available.join(", ")))
        .with_suggestion("Pick one of the available attributes with --attribute")
        .with_help("Run: reclass attributes <source>")
}

pub fn unmapped_value(feature: &str, value: &str) -> CliError {
    CliError::new("Reclassification matrix is incomplete")
        .with_context(format!(
            "Feature {} has value {} which has no row in the matrix.\n\nNothing was written.",
            feature, value
        ))
        .with_suggestion(format!("Add a row for {} to the matrix table", value))
        .with_suggestion("List every class with: reclass classes <source> --attribute <attribute>")
}

pub fn unknown_matrix_key(key: &str) -> CliError {
    CliError::new(format!("Matrix key {} is not a class of the source", key))
        .with_suggestion("Remove the row or fix its code")
        .with_help("Run: reclass classes <source> --attribute <attribute>")
}

pub fn invalid_class_table(path: &Path, line: u64, reason: &str) -> CliError {
    CliError::new("Invalid class table")
        .with_context(format!("{}, line {}: {}", path.display(), line, reason))
        .with_suggestion("Each row must be code,label,color with no header")
        .with_suggestion("Colors are hex strings such as #1f9e3a")
}

pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check reclass.toml for syntax errors")
        .with_help("Run: reclass config")
}

/// Convert a ReclassError to a CliError with suggestions
pub fn from_reclass(error: &ReclassError) -> CliError {
    match error {
        ReclassError::NotFound { path } => source_not_found(path),
        ReclassError::UnrecognizedFormat { .. } | ReclassError::UnrecognizedAssetType { .. } => {
            unrecognized_source(&error.to_string())
        }
        ReclassError::AttributeNotFound { attribute, available } => attribute_not_found(attribute, available),
        ReclassError::UnmappedValue { feature, value } => unmapped_value(feature, value),
        ReclassError::MatrixKeyNotInCatalog { key } => unknown_matrix_key(key),
        ReclassError::InvalidCatalog { path, line, reason } => invalid_class_table(path, *line, reason),
        ReclassError::ConfigMissing { key } if key == TOKEN_ENV => missing_token(),
        ReclassError::ConfigInvalid { key, reason } => invalid_config(key, reason),
        other => CliError::new(other.to_string()),
    }
}

/// Convert anyhow::Error to CliError, using the first domain error in the
/// chain when there is one
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    for cause in error.chain() {
        if let Some(reclass) = cause.downcast_ref::<ReclassError>() {
            return from_reclass(reclass).with_context_if_missing(&error);
        }
        if let Some(EarthEngineError::MissingToken(_)) = cause.downcast_ref::<EarthEngineError>() {
            return missing_token();
        }
    }

    let message = format!("{:#}", error);
    if message.contains("permission denied") || message.contains("Permission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check file permissions")
    } else {
        CliError::new(message)
    }
}
