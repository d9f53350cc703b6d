//! Error handling for M3D parsing and animation evaluation

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading M3D files or evaluating their animations
#[derive(Debug, Error)]
pub enum M3dError {
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The model file does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A section marker, label, count or value did not match the expected schema
    #[error("Malformed format at line {line}: {message}")]
    MalformedFormat {
        /// 1-based line number where the mismatch was detected
        line: usize,
        /// Description of what was expected
        message: String,
    },

    /// An animation clip was requested that the model does not contain
    #[error("Invalid clip name: '{0}'")]
    InvalidClipName(String),

    /// The data parsed but violates a structural invariant
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Type alias for Results from M3D operations
pub type Result<T> = std::result::Result<T, M3dError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = M3dError::MalformedFormat {
            line: 12,
            message: "expected 'Position:', found 'Normal:'".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Malformed format at line 12: expected 'Position:', found 'Normal:'"
        );

        let error = M3dError::InvalidClipName("Run".to_string());
        assert_eq!(format!("{}", error), "Invalid clip name: 'Run'");

        let error = M3dError::FileNotFound(PathBuf::from("Models/soldier.m3d"));
        assert_eq!(format!("{}", error), "File not found: Models/soldier.m3d");
    }
}
