//! Milky Way globular cluster catalog.
//!
//! Structural parameters (Baumgardt-style table) and metallicities
//! (Harris-style table) are loaded separately and inner-joined on the
//! cluster name. Clusters without a metallicity measurement carry a sentinel
//! value in the metallicity table and are dropped before the join.

use crate::config::ObservedConfig;
use crate::error::{MatchError, Result};
use crate::models::FileFormat;
use crate::reader::{LoadOverrides, TabularFileReader};
use crate::table::{filter_rows, float_values, string_values};

use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

const ROW_ORDER: &str = "__row_order";

/// Loader for the two observational tables
#[derive(Debug, Clone)]
pub struct ObservedCatalogLoader {
    config: ObservedConfig,
    reader: TabularFileReader,
}

impl Default for ObservedCatalogLoader {
    fn default() -> Self {
        Self::new(ObservedConfig::default())
    }
}

impl ObservedCatalogLoader {
    pub fn new(config: ObservedConfig) -> Self {
        Self {
            config,
            reader: TabularFileReader::new(FileFormat::Plain),
        }
    }

    pub fn config(&self) -> &ObservedConfig {
        &self.config
    }

    /// Load the structural table, keeping the configured columns
    pub fn load_structural(&self, path: &Path) -> Result<DataFrame> {
        let overrides = LoadOverrides::default()
            .with_columns(self.config.structural_columns())
            .with_text_columns([self.config.key_column.clone()]);
        self.reader.read(path, &overrides)
    }

    /// Load the metallicity table without unmeasured clusters
    pub fn load_metallicities(&self, path: &Path) -> Result<DataFrame> {
        let overrides = LoadOverrides::default()
            .with_columns([
                self.config.key_column.clone(),
                self.config.metallicity_column.clone(),
            ])
            .with_text_columns([self.config.key_column.clone()]);
        let frame = self.reader.read(path, &overrides)?;

        let mask: Vec<bool> = float_values(&frame, &self.config.metallicity_column)?
            .into_iter()
            .map(|value| value != self.config.unmeasured_metallicity)
            .collect();
        let measured = filter_rows(&frame, &mask)?;

        debug!(
            "Dropped {} clusters without a metallicity measurement",
            frame.height() - measured.height()
        );
        Ok(measured)
    }

    /// Inner-join both tables on the cluster key
    ///
    /// The result keeps the structural table's row order with the key column
    /// first.
    pub fn join(&self, structural: DataFrame, metallicities: DataFrame) -> Result<DataFrame> {
        let key = self.config.key_column.as_str();

        let structural_keys: HashSet<String> = string_values(&structural, key)?.into_iter().collect();
        let shared = string_values(&metallicities, key)?
            .iter()
            .filter(|name| structural_keys.contains(*name))
            .count();
        if shared == 0 {
            return Err(MatchError::Join {
                reason: format!("observational tables share no '{}' values", key),
            });
        }

        let structural = structural.with_row_index(ROW_ORDER.into(), None)?;
        let joined = structural
            .lazy()
            .join(
                metallicities.lazy(),
                [col(key)],
                [col(key)],
                JoinArgs::new(JoinType::Inner),
            )
            .sort_by_exprs([col(ROW_ORDER)], SortMultipleOptions::default())
            .collect()?
            .drop(ROW_ORDER)?;

        let mut names: Vec<String> = vec![key.to_string()];
        names.extend(
            joined
                .get_column_names_str()
                .into_iter()
                .filter(|name| *name != key)
                .map(str::to_string),
        );
        Ok(joined.select(names)?)
    }

    /// Rename the configured role columns to their canonical names
    pub fn canonicalize(&self, catalog: DataFrame) -> Result<DataFrame> {
        let roles: HashMap<&str, &str> = self.config.canonical_names().into_iter().collect();
        let columns = catalog
            .take_columns()
            .into_iter()
            .map(|column| {
                let canonical = roles.get(column.name().as_str()).copied();
                match canonical {
                    Some(canonical) => column.with_name(canonical.into()),
                    None => column,
                }
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    /// Load both tables, join them and apply the canonical column names
    pub fn load(&self, structural_path: &Path, metallicity_path: &Path) -> Result<DataFrame> {
        let structural = self.load_structural(structural_path)?;
        let metallicities = self.load_metallicities(metallicity_path)?;
        let catalog = self.canonicalize(self.join(structural, metallicities)?)?;

        info!("Observed catalog holds {} clusters", catalog.height());
        Ok(catalog)
    }
}
