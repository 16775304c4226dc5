//! Model discovery for CMC catalogs
//!
//! A catalog is a directory holding one entry per model run. Entries are
//! usually directories but may be archives, so any entry whose name ends in
//! the configured extension counts.

use crate::error::{MatchError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Model discovery component for a catalog directory
#[derive(Debug)]
pub struct ModelDiscovery {
    catalog_path: PathBuf,
    skipped: usize,
}

impl ModelDiscovery {
    pub fn new(catalog_path: PathBuf) -> Self {
        Self {
            catalog_path,
            skipped: 0,
        }
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    /// Entries seen during the last scan that did not match the extension
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Discover model keys, sorted lexically
    ///
    /// ```text
    /// catalog/
    ///   N1e5_rv1_rg8_Z0.0002/
    ///     initial.conv.sh
    ///     initial.dyn.dat
    ///   N2e5_rv1_rg8_Z0.002_v2/
    ///     ...
    /// ```
    pub async fn discover_models(&mut self, extension: &str) -> Result<Vec<String>> {
        if !self.catalog_path.is_dir() {
            return Err(MatchError::DatasetNotFound {
                path: self.catalog_path.clone(),
            });
        }

        debug!("Searching for models in: {}", self.catalog_path.display());

        let mut keys = Vec::new();
        let mut skipped = 0usize;
        let mut dir = fs::read_dir(&self.catalog_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(extension) {
                keys.push(name);
            } else {
                skipped += 1;
            }
        }

        self.skipped = skipped;

        if keys.is_empty() {
            return Err(MatchError::EmptyCatalog {
                path: self.catalog_path.clone(),
                extension: extension.to_string(),
            });
        }

        keys.sort();
        debug!(
            "Found {} models ({} other entries skipped)",
            keys.len(),
            self.skipped
        );

        Ok(keys)
    }
}
