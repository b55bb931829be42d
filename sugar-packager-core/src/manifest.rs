//! Package manifest type representing `manifest.json` inside a package archive.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::ManifestError;

/// Fixed name of the manifest entry inside every package.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Separator used when the file list is flattened into upload metadata.
pub const FILES_SEPARATOR: &str = ", ";

/// The contents of `manifest.json`.
///
/// Only `files` is required. Any other top-level fields are kept as-is so that
/// manifests written by other tools survive a read and re-upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Paths of the packaged files, relative to the installation root.
    pub files: Vec<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Manifest {
    pub fn new(files: Vec<String>) -> Self {
        Manifest {
            files,
            fields: BTreeMap::new(),
        }
    }

    /// Flatten the manifest into string key/value pairs suitable for object metadata.
    ///
    /// `files` becomes a single `", "`-joined string. Strings pass through, numbers and
    /// booleans are rendered, arrays are joined like `files`, objects are encoded as JSON
    /// and nulls are dropped.
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        for (key, value) in &self.fields {
            if let Some(rendered) = render_value(value) {
                metadata.insert(key.clone(), rendered);
            }
        }
        metadata.insert("files".to_owned(), self.files.join(FILES_SEPARATOR));
        metadata
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(render_value)
                .collect::<Vec<_>>()
                .join(FILES_SEPARATOR),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Read and parse the [`MANIFEST_ENTRY`] of a zip package.
///
/// # Errors
///
/// [`ManifestError::Archive`] if the reader is not a zip, [`ManifestError::MissingEntry`]
/// if there is no manifest, [`ManifestError::Parse`] if it is not a manifest object.
pub fn read_manifest<R: Read + Seek>(reader: R) -> Result<Manifest, ManifestError> {
    let mut archive = ZipArchive::new(reader)?;
    let entry = match archive.by_name(MANIFEST_ENTRY) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(ManifestError::MissingEntry(MANIFEST_ENTRY)),
        Err(e) => return Err(e.into()),
    };
    let manifest: Manifest = serde_json::from_reader(entry)?;
    debug!(files = manifest.files.len(), "Manifest read from package");
    Ok(manifest)
}
