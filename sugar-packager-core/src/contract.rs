//! # contract: collaborator interfaces for the packaging pipeline
//!
//! The CLI only sequences calls; the work itself happens behind three traits:
//!
//! - [`Packager`] turns an installation directory into a zip archive and returns its [`Manifest`].
//! - [`CredentialSource`] yields storage credentials from whatever chain the implementor knows.
//! - [`Uploader`] stores a local file plus metadata in an object-storage bucket.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so the dispatcher can be tested without a
//!   filesystem walk or a network round-trip.
//! - Request and response types are plain data and derive `PartialEq` for use in predicates.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use mockall::automock;

use crate::error::{PackError, UploadFailure};
use crate::manifest::Manifest;

/// The closed set of package layouts a packager knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageKind {
    /// Package for import into the hosted environment. Skips regenerable directories.
    #[default]
    Cloud,
    /// Full package of the installation, nothing but VCS metadata skipped.
    MySQL,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageKind::Cloud => f.write_str("Cloud"),
            PackageKind::MySQL => f.write_str("MySQL"),
        }
    }
}

impl FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloud" => Ok(PackageKind::Cloud),
            "mysql" => Ok(PackageKind::MySQL),
            _ => Err(format!(
                "'{s}' is not a valid package type; valid types are \"Cloud\" or \"MySQL\""
            )),
        }
    }
}

/// Everything a packager is bound to for a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct PackJob {
    /// Root of the installation to package.
    pub install_path: PathBuf,
    /// Directory the archive is written to.
    pub destination: PathBuf,
    /// File name of the archive inside `destination`.
    pub name: String,
    /// Output verbosity, 0-5.
    pub verbosity: u8,
    pub kind: PackageKind,
}

impl PackJob {
    /// Where the finished archive lands: `<destination>/<name>`.
    pub fn archive_path(&self) -> PathBuf {
        self.destination.join(&self.name)
    }
}

/// Trait for building a package from an installation directory.
///
/// On success the archive exists at [`PackJob::archive_path`] and the returned
/// manifest is the one embedded in it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Packager {
    fn pack(&self, job: &PackJob) -> Result<Manifest, PackError>;
}

/// Access key / secret pair for the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
    /// Session token, present for temporary credentials.
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Credentials {
            key: key.into(),
            secret: secret.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"** redacted **")
            .field("token", &self.token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

/// Trait for looking up credentials from the environment, profile files, etc.
///
/// An `Err` means "nothing found"; callers decide whether that is fatal.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn provide(&self) -> Result<Credentials, Box<dyn std::error::Error + Send + Sync>>;
}

/// A single object upload: local file, destination and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PutObject {
    pub bucket: String,
    pub region: String,
    /// Object key, the package file name.
    pub key: String,
    /// Local path of the package.
    pub source: PathBuf,
    pub metadata: BTreeMap<String, String>,
    pub credentials: Credentials,
}

/// What the store reports back after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub e_tag: String,
    /// Expiration header as returned by the store, if the bucket has a lifecycle rule.
    pub expiration: Option<String>,
}

/// Trait for storing a package in an object-storage bucket.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn put_object(&self, req: PutObject) -> Result<UploadReceipt, UploadFailure>;
}
