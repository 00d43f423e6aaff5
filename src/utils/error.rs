use thiserror::Error;

#[derive(Error, Debug)]
pub enum DidError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Column '{column}' not found in input (available: {})", available.join(", "))]
    MissingColumnError {
        column: String,
        available: Vec<String>,
    },

    #[error("Estimation error: {message}")]
    EstimationError { message: String },

    #[error("Chart rendering error: {message}")]
    RenderError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Schema,
    Data,
    Estimation,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DidError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DidError::ConfigError { .. }
            | DidError::ConfigValidationError { .. }
            | DidError::MissingConfigError { .. }
            | DidError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DidError::MissingColumnError { .. } => ErrorCategory::Schema,
            DidError::CsvError(_) => ErrorCategory::Data,
            DidError::EstimationError { .. } => ErrorCategory::Estimation,
            DidError::RenderError { .. } | DidError::SerializationError(_) => {
                ErrorCategory::Output
            }
            DidError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Estimation => ErrorSeverity::Medium,
            ErrorCategory::Configuration
            | ErrorCategory::Schema
            | ErrorCategory::Data
            | ErrorCategory::Output => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DidError::MissingColumnError { column, .. } => format!(
                "Add a '{}' column to the input file or map the correct header in the [columns] section of the config",
                column
            ),
            DidError::ConfigValidationError { field, .. }
            | DidError::InvalidConfigValueError { field, .. } => {
                format!("Check the '{}' setting in your configuration", field)
            }
            DidError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            DidError::ConfigError { .. } => "Review the configuration file syntax".to_string(),
            DidError::CsvError(_) => {
                "Make sure the input is a delimited text file and the delimiter setting matches"
                    .to_string()
            }
            DidError::IoError(_) => {
                "Check that the input file exists and the output directory is writable".to_string()
            }
            DidError::EstimationError { .. } => {
                "Inspect the transition table: the regression needs at least one transition with a finite wage change"
                    .to_string()
            }
            DidError::RenderError { .. } | DidError::SerializationError(_) => {
                "Re-run with --no-charts or without --json to isolate the output step".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DidError::MissingColumnError { column, .. } => {
                format!("The input file has no '{}' column", column)
            }
            DidError::IoError(e) => format!("File access failed: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DidError>;
