//! The error taxonomy of the CLI and the single table mapping it to exit codes.

use std::path::PathBuf;

use sugar_packager_core::error::{ManifestError, PackError, UploadFailure};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad command line. The usage text is shown before the message.
    #[error("{0}")]
    Usage(String),
    /// Malformed `--aws-creds`, unknown `--s3bucket`.
    #[error("{0}")]
    Config(String),
    /// Upload requested but no credentials could be resolved.
    #[error("no AWS credentials found, could not upload package.")]
    Credential,
    #[error("could not read package {}; make sure it exists and its permissions allow reading", .0.display())]
    PackageRead(PathBuf),
    #[error("could not read manifest from {}; please make sure it is a valid package: {source}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },
    #[error("{message}")]
    Packaging { code: i32, message: String },
    #[error("{message}")]
    Upload { code: i32, message: String },
}

impl CliError {
    /// Collaborator codes pass through unless they are 0; everything detected locally exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Packaging { code, .. } | CliError::Upload { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

impl From<PackError> for CliError {
    fn from(e: PackError) -> Self {
        CliError::Packaging {
            code: e.exit_code(),
            message: e.to_string(),
        }
    }
}

impl From<UploadFailure> for CliError {
    fn from(e: UploadFailure) -> Self {
        CliError::Upload {
            code: e.code,
            message: e.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_errors_exit_with_one() {
        assert_eq!(CliError::Usage("bad".into()).exit_code(), 1);
        assert_eq!(CliError::Config("bad".into()).exit_code(), 1);
        assert_eq!(CliError::Credential.exit_code(), 1);
        assert_eq!(CliError::PackageRead(PathBuf::from("pkg.zip")).exit_code(), 1);
    }

    #[test]
    fn collaborator_codes_pass_through() {
        let packaging: CliError = PackError::InvalidDestination(PathBuf::from("/out")).into();
        assert_eq!(packaging.exit_code(), 3);
        let upload: CliError = UploadFailure::new(7, "AccessDenied").into();
        assert_eq!(upload.exit_code(), 7);
        assert_eq!(upload.to_string(), "AccessDenied");
    }

    #[test]
    fn zero_collaborator_code_still_fails() {
        let upload: CliError = UploadFailure::new(0, "socket closed").into();
        assert_eq!(upload.exit_code(), 1);
    }
}
