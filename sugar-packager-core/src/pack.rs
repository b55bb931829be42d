//! Creates a zip package from an installation directory, with `manifest.json` as the last entry.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::contract::{PackJob, PackageKind, Packager};
use crate::error::PackError;
use crate::manifest::{Manifest, MANIFEST_ENTRY};
use crate::report::Reporter;
use crate::APP_NAME;

/// Directories never packed, at any depth.
const VCS_DIRS: &[&str] = &[".git", ".svn"];

/// Top-level directories a cloud package leaves out.
const CLOUD_SKIPPED_DIRS: &[&str] = &["cache", "upload"];

/// The zip-writing [`Packager`].
///
/// Walks the installation (symlinks are skipped, entries sorted by name), stores
/// every regular file under its `/`-separated relative path and appends the manifest.
#[derive(Debug, Clone, Default)]
pub struct ArchivePackager {
    reporter: Option<Reporter>,
}

impl ArchivePackager {
    pub fn new() -> Self {
        ArchivePackager::default()
    }

    /// Send progress to `reporter` instead of a stdout reporter built from the job's verbosity.
    pub fn with_reporter(reporter: Reporter) -> Self {
        ArchivePackager {
            reporter: Some(reporter),
        }
    }
}

impl Packager for ArchivePackager {
    fn pack(&self, job: &PackJob) -> Result<Manifest, PackError> {
        let reporter = self
            .reporter
            .clone()
            .unwrap_or_else(|| Reporter::new(job.verbosity));

        info!(
            install_path = %job.install_path.display(),
            destination = %job.destination.display(),
            name = %job.name,
            kind = %job.kind,
            "[PACK] Starting package build"
        );

        if !job.install_path.is_dir() {
            debug!(path = %job.install_path.display(), "[PACK] Installation path is not a directory");
            return Err(PackError::InvalidInstallPath(job.install_path.clone()));
        }
        if !job.destination.is_dir() {
            debug!(path = %job.destination.display(), "[PACK] Destination is not a directory");
            return Err(PackError::InvalidDestination(job.destination.clone()));
        }

        reporter.log(format!("Packing {}...", job.install_path.display()), 1);

        let archive_path = job.archive_path();
        let file = File::create(&archive_path)?;
        // The archive may sit inside the tree being walked; compare canonical paths to skip it.
        let archive_canonical = archive_path.canonicalize()?;
        let install_root = job.install_path.canonicalize()?;

        let mut zip = ZipWriter::new(file);
        let files = write_tree(&mut zip, &install_root, &archive_canonical, job.kind, &reporter)?;

        let manifest = build_manifest(files, job.kind);
        zip.start_file(MANIFEST_ENTRY, entry_options(0))?;
        serde_json::to_writer_pretty(&mut zip, &manifest)?;
        zip.finish()?;

        info!(
            archive = %archive_path.display(),
            files = manifest.files.len(),
            "[PACK] Package written"
        );
        reporter.log(format!("Package written to {}", archive_path.display()), 1);
        Ok(manifest)
    }
}

fn write_tree(
    zip: &mut ZipWriter<File>,
    install_root: &Path,
    archive_path: &Path,
    kind: PackageKind,
    reporter: &Reporter,
) -> Result<Vec<String>, PackError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(install_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry, kind));

    for entry in walker {
        let entry = entry?;
        if entry.path_is_symlink() {
            warn!(path = %entry.path().display(), "[PACK] Symbolic links are not packed; skipping it");
            continue;
        }
        if !entry.file_type().is_file() || entry.path() == archive_path {
            continue;
        }
        let relative = relative_name(install_root, entry.path());
        if relative == MANIFEST_ENTRY {
            warn!(path = %entry.path().display(), "[PACK] Installation contains its own manifest.json; skipping it");
            continue;
        }

        let len = entry.metadata()?.len();
        debug!(file = %relative, bytes = len, "[PACK] Adding file");
        reporter.log(format!("  {relative}"), 3);

        zip.start_file(relative.as_str(), entry_options(len))?;
        let mut source = BufReader::new(File::open(entry.path())?);
        io::copy(&mut source, zip)?;
        files.push(relative);
    }
    Ok(files)
}

fn is_skipped(entry: &DirEntry, kind: PackageKind) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if VCS_DIRS.contains(&name.as_ref()) {
        return true;
    }
    match kind {
        PackageKind::Cloud => entry.depth() == 1 && CLOUD_SKIPPED_DIRS.contains(&name.as_ref()),
        PackageKind::MySQL => false,
    }
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn entry_options(len: u64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(len >= u64::from(u32::MAX))
}

fn build_manifest(files: Vec<String>, kind: PackageKind) -> Manifest {
    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut fields = BTreeMap::new();
    fields.insert("app".to_owned(), Value::from(APP_NAME));
    fields.insert("version".to_owned(), Value::from(env!("CARGO_PKG_VERSION")));
    fields.insert("package_type".to_owned(), Value::from(kind.to_string()));
    fields.insert("created_at".to_owned(), Value::from(created_at.to_string()));
    Manifest { files, fields }
}

/// SHA-256 of a package file, lowercase hex.
pub fn package_digest(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut file = BufReader::new(File::open(path)?);
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Base file name of a package path, as used for the object key.
pub fn package_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_names_use_forward_slashes() {
        let root = Path::new("/srv/app");
        assert_eq!(
            relative_name(root, Path::new("/srv/app/modules/Accounts/Account.php")),
            "modules/Accounts/Account.php"
        );
    }

    #[test]
    fn package_name_is_the_base_name() {
        assert_eq!(package_name(Path::new("/tmp/out/AKIA.1700000000.zip")), "AKIA.1700000000.zip");
        assert_eq!(package_name(Path::new("pkg.zip")), "pkg.zip");
    }

    #[test]
    fn manifest_records_kind_and_app() {
        let manifest = build_manifest(vec!["a.php".into()], PackageKind::MySQL);
        assert_eq!(manifest.fields["package_type"], Value::from("MySQL"));
        assert_eq!(manifest.fields["app"], Value::from(APP_NAME));
        assert!(manifest.fields["created_at"].as_str().unwrap().parse::<u64>().is_ok());
    }
}
