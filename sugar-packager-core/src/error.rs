//! Error types raised by the collaborators. Each one knows the process exit code it maps to.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while building a package.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("installation path {} does not exist or is not a directory", .0.display())]
    InvalidInstallPath(PathBuf),
    #[error("destination {} does not exist or is not a directory", .0.display())]
    InvalidDestination(PathBuf),
    #[error("could not walk installation directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("I/O error while packing: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not write archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("could not encode manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl PackError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PackError::InvalidInstallPath(_) => 2,
            PackError::InvalidDestination(_) => 3,
            PackError::Walk(_) | PackError::Io(_) | PackError::Archive(_) | PackError::Manifest(_) => 4,
        }
    }
}

/// Failure while reading the manifest out of an existing package.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("not a readable zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive has no {0} entry")]
    MissingEntry(&'static str),
    #[error("could not read manifest entry: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest is not valid JSON or has no files list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure reported by an [`Uploader`](crate::contract::Uploader), with the code to exit with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UploadFailure {
    pub code: i32,
    pub message: String,
}

impl UploadFailure {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        UploadFailure {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_errors_map_to_distinct_codes() {
        assert_eq!(PackError::InvalidInstallPath(PathBuf::from("/nope")).exit_code(), 2);
        assert_eq!(PackError::InvalidDestination(PathBuf::from("/nope")).exit_code(), 3);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(PackError::from(io).exit_code(), 4);
    }

    #[test]
    fn pack_error_message_names_the_path() {
        let err = PackError::InvalidInstallPath(PathBuf::from("/srv/missing"));
        assert!(err.to_string().contains("/srv/missing"));
    }
}
