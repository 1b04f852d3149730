//! File ingestion: turns a directory of text-like files into [`SourceDocument`]s.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{MetaValue, SourceDocument};

pub const DEFAULT_EXTENSIONS: [&str; 3] = ["txt", "md", "html"];

#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    extensions: Vec<String>,
}

impl Default for DirectoryLoader {
    fn default() -> Self { Self::new(DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()) }
}

impl DirectoryLoader {
    pub fn new(extensions: Vec<String>) -> Self {
        let extensions = extensions.into_iter().map(|e| e.trim_start_matches('.').to_ascii_lowercase()).collect();
        Self { extensions }
    }

    pub fn extensions(&self) -> &[String] { &self.extensions }

    /// Sorted list of matching files under `root`.
    pub fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| self.accepts(p))
            .collect();
        files.sort();
        files
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Read every matching file. Unreadable files are skipped with a warning.
    pub fn load_dir(&self, root: &Path) -> Result<Vec<SourceDocument>> {
        if !root.is_dir() {
            return Err(Error::InvalidArgument(format!("not a directory: {}", root.display())));
        }
        let files = self.list_files(root);
        debug!(root = %root.display(), files = files.len(), "scanned archive directory");
        let mut out = Vec::with_capacity(files.len());
        for path in files {
            match self.load_file(root, &path) {
                Ok(doc) => out.push(doc),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }
        Ok(out)
    }

    pub fn load_file(&self, root: &Path, path: &Path) -> Result<SourceDocument> {
        let content = read_file_content(path)?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        let filename = relative.to_string_lossy().replace('\\', "/");
        let mut doc = SourceDocument::new(filename, content)
            .with_meta("path", path.to_string_lossy().to_string());
        if let Ok(meta) = fs::metadata(path) {
            doc = doc.with_meta("size_bytes", MetaValue::Number(meta.len() as f64));
            if let Ok(modified) = meta.modified() {
                doc = doc.with_meta("modified", MetaValue::Date(DateTime::<Utc>::from(modified)));
            }
        }
        Ok(doc)
    }
}

fn read_file_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}
