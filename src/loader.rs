use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::FileError;
use crate::model::LoadError;

/// Retrieves raw source text for an opaque file identifier.
pub trait SourceLoader: Sync {
    fn load(&self, file_name: &str) -> Result<String, FileError>;
}

/// Result of a batch load: text keyed by the identifier exactly as requested,
/// plus one error per identifier that could not be read (in request order).
#[derive(Debug, Default)]
pub struct LoadedSources {
    pub contents: HashMap<String, String>,
    pub errors: Vec<LoadError>,
}

impl LoadedSources {
    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.contents.get(file_name).map(String::as_str)
    }
}

/// Load every identifier independently. One failure never aborts the rest.
pub fn load_sources(loader: &dyn SourceLoader, file_names: &[&str]) -> LoadedSources {
    let loaded: Vec<(&str, Result<String, FileError>)> = file_names
        .par_iter()
        .map(|name| (*name, loader.load(name)))
        .collect();

    let mut out = LoadedSources::default();
    for (name, res) in loaded {
        match res {
            Ok(text) => {
                out.contents.insert(name.to_string(), text);
            }
            Err(e) => {
                tracing::warn!(file = name, error = %e, "source load failed");
                out.errors.push(LoadError {
                    file_name: name.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    out
}

/// Reads from the local file system. Relative identifiers resolve against `base_dir`.
#[derive(Debug, Clone)]
pub struct FsLoader {
    base_dir: PathBuf,
    max_file_bytes: u64,
}

impl FsLoader {
    pub fn new(base_dir: impl Into<PathBuf>, max_file_bytes: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_file_bytes,
        }
    }

    fn resolve(&self, file_name: &str) -> PathBuf {
        let p = Path::new(file_name);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }
}

impl SourceLoader for FsLoader {
    fn load(&self, file_name: &str) -> Result<String, FileError> {
        let path = self.resolve(file_name);
        tracing::debug!(path = %path.display(), "reading file");

        let meta = std::fs::metadata(&path).map_err(|source| FileError::Read {
            path: path.clone(),
            source,
        })?;
        if meta.len() > self.max_file_bytes {
            return Err(FileError::TooLarge {
                path,
                bytes: meta.len(),
                limit: self.max_file_bytes,
            });
        }

        let raw = std::fs::read(&path).map_err(|source| FileError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(String::from_utf8(raw).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }
}

/// In-memory sources, keyed by identifier. Missing keys load as not-found.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(file_name.into(), text.into());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, file_name: &str) -> Result<String, FileError> {
        self.files.get(file_name).cloned().ok_or_else(|| FileError::Read {
            path: PathBuf::from(file_name),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        })
    }
}
