//! Schema Document Store
//!
//! Every operation loads the schema file, works on its own in-memory copy
//! and, for mutations, writes the result back before returning. Nothing is
//! cached between calls.
//!
//! Writes go to a temporary file in the target directory which is then
//! renamed over the original, so a failed write never leaves a truncated
//! schema behind. Documents remember the checksum of the bytes they were
//! parsed from; writing one back to the same path is refused if the file
//! has changed on disk in the meantime.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::checksum::Checksum;
use crate::config::StoreConfig;
use crate::cube::CubeSummary;
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};
use crate::validate::validate;

/// Load and parse a schema file
pub fn load(path: &Path) -> Result<SchemaDocument> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SchemaError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    debug!(path = %path.display(), bytes = bytes.len(), "loaded schema file");
    SchemaDocument::from_bytes(&bytes, path)
}

/// Write a document to `path` in canonical form, refusing to overwrite
/// edits made since it was loaded from that path
pub fn persist(document: &SchemaDocument, path: &Path) -> Result<()> {
    write_document(document, path, true)
}

fn write_document(document: &SchemaDocument, path: &Path, verify_unchanged: bool) -> Result<()> {
    let write_failure = |cause: io::Error| SchemaError::WriteFailure {
        path: path.to_path_buf(),
        cause,
    };

    let target = resolve_target(path).map_err(write_failure)?;

    if verify_unchanged {
        if let Some(origin) = document.origin().filter(|o| o.path.as_path() == path) {
            match Checksum::of_file(&target) {
                Ok(current) if current == origin.checksum => {}
                Ok(_) => return Err(concurrent_modification(path)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(concurrent_modification(path))
                }
                Err(e) => return Err(write_failure(e)),
            }
        }
    }

    let bytes = document
        .to_bytes()
        .map_err(|e| write_failure(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    atomic_write(&target, |file| file.write_all(&bytes)).map_err(write_failure)?;

    debug!(path = %path.display(), target = %target.display(), bytes = bytes.len(), "wrote schema file");
    Ok(())
}

/// Follow symlinks so the file they point at is replaced, not the link.
/// A path that does not exist yet is written as given.
fn resolve_target(path: &Path) -> io::Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(resolved) => Ok(resolved),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(e) => Err(e),
    }
}

fn concurrent_modification(path: &Path) -> SchemaError {
    warn!(path = %path.display(), "schema file changed since it was loaded, refusing to overwrite");
    SchemaError::ConcurrentModification {
        path: path.to_path_buf(),
    }
}

/// Write through a temporary sibling file and rename it over `path`
pub(crate) fn atomic_write<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Cube operations against one schema file
#[derive(Debug, Clone)]
pub struct SchemaDocumentStore {
    path: PathBuf,
    verify_unchanged: bool,
}

impl SchemaDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            verify_unchanged: true,
        }
    }

    /// Store for the document named in the configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.document_path()).with_verify_unchanged(config.document.verify_unchanged)
    }

    /// Toggle the check that refuses to overwrite concurrent edits
    pub fn with_verify_unchanged(mut self, verify: bool) -> Self {
        self.verify_unchanged = verify;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SchemaDocument> {
        load(&self.path)
    }

    pub fn persist(&self, document: &SchemaDocument) -> Result<()> {
        write_document(document, &self.path, self.verify_unchanged)
    }

    /// Names of all cubes, in document order
    pub fn list_cubes(&self) -> Result<Vec<String>> {
        let document = self.load()?;
        Ok(document.enumerate().into_iter().map(String::from).collect())
    }

    /// Canonical XML of one cube
    pub fn get_cube(&self, name: &str) -> Result<String> {
        self.load()?.cube_xml(name)
    }

    pub fn create_cube(&self, payload: &Value) -> Result<CubeSummary> {
        let cube = validate(payload)?;
        let mut document = self.load()?;
        document.create(&cube)?;
        self.persist(&document)?;

        info!(cube = %cube.name, path = %self.path.display(), "created cube");
        Ok(cube.summary())
    }

    /// Replace the cube called `name` with the payload's definition
    pub fn update_cube(&self, name: &str, payload: &Value) -> Result<CubeSummary> {
        let cube = validate(payload)?;
        let mut document = self.load()?;
        document.replace(name, &cube)?;
        self.persist(&document)?;

        info!(cube = name, new_name = %cube.name, path = %self.path.display(), "updated cube");
        Ok(cube.summary())
    }

    pub fn delete_cube(&self, name: &str) -> Result<()> {
        let mut document = self.load()?;
        document.remove(name)?;
        self.persist(&document)?;

        info!(cube = name, path = %self.path.display(), "deleted cube");
        Ok(())
    }

    /// The whole schema file in canonical form
    pub fn read_document(&self) -> Result<String> {
        let bytes = self
            .load()?
            .to_bytes()
            .map_err(|e| SchemaError::malformed(self.path.clone(), e))?;
        String::from_utf8(bytes).map_err(|e| SchemaError::malformed(self.path.clone(), e))
    }

    /// Replace the whole schema file with uploaded XML text.
    ///
    /// The text must parse as a schema document; it is written back in
    /// canonical form. Returns the cube names of the new document.
    pub fn replace_document(&self, text: &str) -> Result<Vec<String>> {
        let document = SchemaDocument::parse(text, &self.path)?;
        write_document(&document, &self.path, false)?;

        let names: Vec<String> = document.enumerate().into_iter().map(String::from).collect();
        info!(path = %self.path.display(), cubes = names.len(), "replaced schema file");
        Ok(names)
    }
}
