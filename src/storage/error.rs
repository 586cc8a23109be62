//! Error types for storage collaborators

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("Storage full: cannot store {0}")]
    StorageFull(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid thumbnail file name: {0}")]
    InvalidFileName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: denied");
    }

    #[test]
    fn test_display() {
        let err = StorageError::StorageFull("0000042.png".to_string());
        assert_eq!(err.to_string(), "Storage full: cannot store 0000042.png");

        let err = StorageError::InvalidFileName("../etc/passwd".to_string());
        assert!(err.to_string().contains("../etc/passwd"));
    }
}
