//! Orchestrates a run: pack (or load an existing package), then optionally upload.
//!
//! The flow for a validated [`Configuration`]:
//!   - derive the package name when none was given
//!   - `--upload <path>`: read the manifest out of that package, never call the packager
//!   - otherwise: have the [`Packager`] build `<destination>/<name>`
//!   - if any form of `--upload` was given: check bucket and credentials, then hand the
//!     package to the [`Uploader`]
//!
//! Packaging and upload are not transactional. A failed upload leaves the package on disk.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sugar_packager_core::config::lookup_bucket;
use sugar_packager_core::contract::{
    Credentials, PackJob, Packager, PutObject, UploadReceipt, Uploader,
};
use sugar_packager_core::manifest::{read_manifest, Manifest};
use sugar_packager_core::pack::{package_digest, package_name};
use sugar_packager_core::report::Reporter;
use tracing::{debug, info, warn};

use crate::cli::{Configuration, UploadRequest};
use crate::error::CliError;

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Package on disk, created or pre-existing.
    pub package: PathBuf,
    /// Package name, also the object key when uploaded.
    pub name: String,
    pub manifest: Manifest,
    pub upload: Option<UploadReceipt>,
}

pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// `<timestamp>.zip`, prefixed with `<key>.` when a non-empty access key is known.
pub fn default_package_name(key: Option<&str>, timestamp: u64) -> String {
    match key {
        Some(key) if !key.is_empty() => format!("{key}.{timestamp}.zip"),
        _ => format!("{timestamp}.zip"),
    }
}

pub async fn dispatch<P, U>(
    config: &Configuration,
    credentials: Option<&Credentials>,
    packager: &P,
    uploader: &U,
    reporter: &Reporter,
    timestamp: u64,
) -> Result<Outcome, CliError>
where
    P: Packager + ?Sized,
    U: Uploader + ?Sized,
{
    let default_name = || default_package_name(credentials.map(|c| c.key.as_str()), timestamp);
    let name = config.name.clone().unwrap_or_else(default_name);

    let (package, name, manifest) = match &config.upload {
        UploadRequest::Existing(path) => {
            info!(package = %path.display(), "[DISPATCH] Uploading existing package, packing skipped");
            reporter.log("Reading manifest from package...", 1);
            let manifest = load_existing(path)?;
            (path.clone(), package_name(path), manifest)
        }
        UploadRequest::Absent | UploadRequest::PackThenUpload => {
            let install_path = config.sugar_path.clone().ok_or_else(|| {
                CliError::Usage("<sugar-path> is required to create a package".to_owned())
            })?;
            let job = PackJob {
                install_path,
                destination: config.destination.clone(),
                name,
                verbosity: config.verbosity,
                kind: config.kind,
            };
            info!(?job, "[DISPATCH] Packing");
            let manifest = packager.pack(&job).map_err(|e| {
                debug!(error = %e, code = e.exit_code(), "[DISPATCH] Packaging failed");
                CliError::from(e)
            })?;
            (job.archive_path(), job.name, manifest)
        }
    };

    if !config.upload.is_requested() {
        info!(package = %package.display(), "[DISPATCH] Done, no upload requested");
        return Ok(Outcome {
            package,
            name,
            manifest,
            upload: None,
        });
    }

    let receipt = upload_package(config, credentials, &package, &name, &manifest, uploader, reporter).await?;
    Ok(Outcome {
        package,
        name,
        manifest,
        upload: Some(receipt),
    })
}

fn load_existing(path: &Path) -> Result<Manifest, CliError> {
    let file = File::open(path).map_err(|e| {
        debug!(error = %e, package = %path.display(), "[DISPATCH] Package is not readable");
        CliError::PackageRead(path.to_path_buf())
    })?;
    read_manifest(file).map_err(|source| {
        debug!(error = %source, package = %path.display(), "[DISPATCH] Manifest could not be read");
        CliError::ManifestRead {
            path: path.to_path_buf(),
            source,
        }
    })
}

async fn upload_package<U>(
    config: &Configuration,
    credentials: Option<&Credentials>,
    package: &Path,
    name: &str,
    manifest: &Manifest,
    uploader: &U,
    reporter: &Reporter,
) -> Result<UploadReceipt, CliError>
where
    U: Uploader + ?Sized,
{
    let target = lookup_bucket(&config.s3bucket).ok_or_else(|| {
        CliError::Config(format!(
            "'{}' is not a valid S3 bucket, could not upload package.",
            config.s3bucket
        ))
    })?;
    let credentials = credentials.ok_or(CliError::Credential)?;

    if reporter.enabled(2) {
        match package_digest(package) {
            Ok(digest) => reporter.log(format!("Package SHA-256 {digest}"), 2),
            Err(e) => warn!(error = %e, package = %package.display(), "[DISPATCH] Could not hash package"),
        }
    }

    reporter.log("Connecting to S3 bucket...", 1);
    let request = PutObject {
        bucket: target.bucket.to_owned(),
        region: target.region.to_owned(),
        key: name.to_owned(),
        source: package.to_path_buf(),
        metadata: manifest.to_metadata(),
        credentials: credentials.clone(),
    };
    reporter.log("Uploading package...", 1);
    let receipt = uploader.put_object(request).await.map_err(|e| {
        warn!(error = %e, code = e.code, "[DISPATCH] Upload failed, package left in place");
        CliError::from(e)
    })?;

    reporter.log(
        format!(
            "Uploaded '{}' to S3 bucket '{}' \n\tETag {} \n\texpires on {}",
            package.display(),
            target.bucket,
            receipt.e_tag,
            receipt.expiration.as_deref().unwrap_or("never"),
        ),
        1,
    );
    Ok(receipt)
}
