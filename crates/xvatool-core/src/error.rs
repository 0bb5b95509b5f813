//! Error types for the xvatool core library.

use std::path::PathBuf;

/// The main error type for xvatool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error with optional path context.
    #[error("I/O error{}: {source}", path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default())]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// A disk key was registered twice on the same builder.
    #[error("duplicate disk key: '{key}'")]
    DuplicateDisk { key: String },

    /// A disk reported a malformed extent list.
    #[error("invalid extent: {message}")]
    InvalidExtent { message: String },

    /// Error in the export orchestrator.
    #[error("export error: {message}")]
    Export { message: String },
}

/// A specialized Result type for xvatool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an I/O error with path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Create an I/O error without path context.
    pub fn io_simple(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Create a duplicate disk key error.
    pub fn duplicate_disk(key: impl Into<String>) -> Self {
        Self::DuplicateDisk { key: key.into() }
    }

    /// Create an invalid extent error.
    pub fn invalid_extent(message: impl Into<String>) -> Self {
        Self::InvalidExtent {
            message: message.into(),
        }
    }

    /// Create an export error.
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_simple(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io(io_err, "/path/to/disk.img");
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("/path/to/disk.img"));
    }

    #[test]
    fn test_io_error_without_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io_simple(io_err);
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(!msg.contains("at '"));
    }

    #[test]
    fn test_duplicate_disk_error() {
        let err = Error::duplicate_disk("d1");
        assert!(err.to_string().contains("duplicate disk key"));
        assert!(err.to_string().contains("d1"));
    }

    #[test]
    fn test_invalid_extent_error() {
        let err = Error::invalid_extent("extent 3 overlaps its predecessor");
        assert!(err.to_string().contains("invalid extent"));
        assert!(err.to_string().contains("extent 3"));
    }

    #[test]
    fn test_export_error() {
        let err = Error::export("no input images given");
        assert!(err.to_string().contains("export error"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io { path: None, .. }));
    }
}
