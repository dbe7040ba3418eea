//! PNG image assets referenced by chapters.
//!
//! The library is a flat directory. [`ImageLibrary::reconcile`] makes the
//! directory match a keep-list plus a batch of uploads; the batch is checked
//! up front so a rejected batch leaves the directory untouched.

use std::path::{Path, PathBuf};

use crate::IMAGE_EXTENSION;
use crate::error::{DataError, FieldErrors, StoreError};
use crate::store::atomic_write;

/// An uploaded file waiting to be written into the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    /// Client-supplied filename; sanitized before use.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl NewImage {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageLibrary {
    dir: PathBuf,
}

impl ImageLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the directory if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))
    }

    /// Every `.png` entry in the directory, in directory listing order.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if has_png_extension(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Raw bytes of one image.
    ///
    /// Names that are not already in sanitized form are refused, which keeps
    /// lookups inside the library directory.
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, DataError> {
        let not_found = || DataError::ImageNotFound {
            filename: filename.to_string(),
        };
        if sanitize_filename(filename).as_deref() != Some(filename) {
            return Err(not_found());
        }
        let path = self.dir.join(filename);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(StoreError::io(path, e).into()),
        }
    }

    /// Delete every listed image not named in `keep`, then write `new_files`.
    ///
    /// Same-named existing files are overwritten. If any upload has no
    /// usable filename, or its sanitized name is not a PNG, nothing is
    /// deleted or written.
    pub fn reconcile(&self, keep: &[String], new_files: &[NewImage]) -> Result<(), DataError> {
        let mut targets = Vec::with_capacity(new_files.len());
        for file in new_files {
            let Some(name) = sanitize_filename(&file.filename) else {
                tracing::warn!("rejecting image batch: unusable filename {:?}", file.filename);
                return Err(FieldErrors::non_field("Invalid filename").into());
            };
            if !has_png_extension(&name) {
                tracing::warn!("rejecting image batch: extension not allowed on {name:?}");
                return Err(FieldErrors::non_field("Extension not allowed").into());
            }
            targets.push((name, &file.bytes));
        }

        let mut removed = 0usize;
        for existing in self.list()? {
            if !keep.contains(&existing) {
                let path = self.dir.join(&existing);
                std::fs::remove_file(&path).map_err(|e| StoreError::io(path, e))?;
                removed += 1;
            }
        }
        for (name, bytes) in &targets {
            atomic_write(&self.dir.join(name), bytes)?;
        }

        tracing::info!(
            removed,
            written = targets.len(),
            "reconciled images in {}",
            self.dir.display()
        );
        Ok(())
    }
}

fn has_png_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == IMAGE_EXTENSION)
}

/// Reduce a client filename to a safe, flat name.
///
/// Keeps the last path component, folds common Latin accents to ASCII,
/// turns whitespace into `_`, drops anything outside `[A-Za-z0-9._-]` and
/// trims leading/trailing `.` and `_`. Returns `None` when nothing is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let c = fold_ascii(c);
        if c.is_whitespace() {
            out.push('_');
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
        }
    }
    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn fold_ascii(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        other => other,
    }
}
