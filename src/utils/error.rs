use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store is locked by another operation")]
    Locked,

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error on '{field}': '{value}' ({reason})")]
    Validation {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Concurrency,
    Storage,
    Format,
    Configuration,
    Domain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl StoreError {
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Locked => ErrorCategory::Concurrency,
            Self::FileNotFound { .. } | Self::Io { .. } => ErrorCategory::Storage,
            Self::Encode { .. } | Self::Decode { .. } => ErrorCategory::Format,
            Self::Config { .. } | Self::InvalidConfigValue { .. } => ErrorCategory::Configuration,
            Self::Validation { .. } => ErrorCategory::Domain,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Locked => ErrorSeverity::Medium,
            Self::Validation { .. } => ErrorSeverity::Medium,
            Self::FileNotFound { .. } | Self::Encode { .. } | Self::Decode { .. } => {
                ErrorSeverity::High
            }
            Self::Config { .. } | Self::InvalidConfigValue { .. } => ErrorSeverity::High,
            Self::Io { .. } => ErrorSeverity::Critical,
        }
    }

    /// Whether calling again without changing anything may succeed.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Locked => "The data file is busy with another operation.".to_string(),
            Self::FileNotFound { path } => format!("No data file at {}.", path.display()),
            Self::Io { path, .. } => format!("Could not access {}.", path.display()),
            Self::Encode { message } => format!("Records could not be written: {}", message),
            Self::Decode { message } => format!("The data file is malformed: {}", message),
            Self::Config { message } => format!("Configuration problem: {}", message),
            Self::InvalidConfigValue { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            Self::Validation { field, reason, .. } => {
                format!("Field '{}' is invalid: {}", field, reason)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Locked => "Wait for the running operation to finish and try again",
            Self::FileNotFound { .. } => "Check the path, or save some records first",
            Self::Io { .. } => "Check file permissions and free disk space",
            Self::Encode { .. } => "Remove characters the chosen format cannot carry, or pick another format",
            Self::Decode { .. } => "Check that the file was written in the selected format",
            Self::Config { .. } | Self::InvalidConfigValue { .. } => {
                "Fix the configuration file or command line flags"
            }
            Self::Validation { .. } => "Correct the field value and try again",
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_io_error_maps_to_file_not_found() {
        let err = StoreError::io(
            "missing.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, StoreError::FileNotFound { .. }));
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn other_io_errors_stay_io() {
        let err = StoreError::io(
            "denied.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
        );
        assert!(matches!(err, StoreError::Io { .. }));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
