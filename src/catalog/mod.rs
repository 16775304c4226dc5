//! CMC model catalog construction.
//!
//! Building a catalog runs in three stages, each consuming the previous
//! value:
//!
//! 1. [`ModelCatalog::index`] lists the model entries of a directory
//! 2. [`IndexedCatalog::parse_names`] parses initial conditions from names
//! 3. [`ParsedCatalog::add_snapshots`] extracts snapshots and joins them onto
//!    the parameters, one row per (model, target time)

pub mod discovery;
pub mod names;
pub mod snapshots;

use self::discovery::ModelDiscovery;
use self::names::{apply_replacements, parse_model_name};
use self::snapshots::SnapshotExtractor;

use crate::constants::model_columns;
use crate::error::Result;
use crate::models::{ModelParams, NamingConvention};
use crate::table::string_values;

use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Entry point of the catalog stages
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelCatalog;

impl ModelCatalog {
    /// Index entries of `directory` whose names end in `extension`
    pub async fn index(directory: impl Into<PathBuf>, extension: &str) -> Result<IndexedCatalog> {
        let mut discovery = ModelDiscovery::new(directory.into());
        let keys = discovery.discover_models(extension).await?;
        info!(
            "Indexed {} models in {}",
            keys.len(),
            discovery.catalog_path().display()
        );
        Ok(IndexedCatalog {
            root: discovery.catalog_path().to_path_buf(),
            keys,
        })
    }
}

/// Catalog with model keys only
#[derive(Debug, Clone)]
pub struct IndexedCatalog {
    root: PathBuf,
    keys: Vec<String>,
}

impl IndexedCatalog {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parse every key into model parameters
    ///
    /// Replacements are applied to a copy of the key; the key itself stays
    /// the lookup value.
    pub fn parse_names(
        self,
        replacements: &[(String, String)],
        convention: &NamingConvention,
    ) -> Result<ParsedCatalog> {
        let models = self
            .keys
            .into_iter()
            .map(|key| {
                let normalized = apply_replacements(&key, replacements);
                let params = parse_model_name(&normalized, convention)?;
                debug!("Parsed {} as {}", key, params);
                Ok((key, params))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ParsedCatalog {
            root: self.root,
            models,
        })
    }
}

/// Catalog with parsed model parameters
#[derive(Debug, Clone)]
pub struct ParsedCatalog {
    root: PathBuf,
    models: Vec<(String, ModelParams)>,
}

impl ParsedCatalog {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn models(&self) -> &[(String, ModelParams)] {
        &self.models
    }

    /// One row per model: key, N, rv, rg, Z
    pub fn params_frame(&self) -> Result<DataFrame> {
        let keys: Vec<&str> = self.models.iter().map(|(key, _)| key.as_str()).collect();
        let n: Vec<i64> = self.models.iter().map(|(_, p)| p.n).collect();
        let rv: Vec<f64> = self.models.iter().map(|(_, p)| p.rv).collect();
        let rg: Vec<f64> = self.models.iter().map(|(_, p)| p.rg).collect();
        let z: Vec<f64> = self.models.iter().map(|(_, p)| p.z).collect();

        Ok(DataFrame::new(vec![
            Column::new(model_columns::KEY.into(), keys),
            Column::new(model_columns::N.into(), n),
            Column::new(model_columns::RV.into(), rv),
            Column::new(model_columns::RG.into(), rg),
            Column::new(model_columns::Z.into(), z),
        ])?)
    }

    /// Extract snapshots of every model and attach each model's parameters
    pub async fn add_snapshots(self, extractor: &SnapshotExtractor) -> Result<SnapshotCatalog> {
        let keys: Vec<String> = self.models.iter().map(|(key, _)| key.clone()).collect();
        let snapshots = extractor.extract_all(&self.root, &keys).await?;
        let params = self.params_frame()?;

        let frame = snapshots
            .lazy()
            .join(
                params.lazy(),
                [col(model_columns::KEY)],
                [col(model_columns::KEY)],
                JoinArgs::new(JoinType::Left),
            )
            .sort_by_exprs(
                [col(model_columns::KEY), col(model_columns::TARGET_TIME)],
                SortMultipleOptions::default(),
            )
            .collect()?;

        let catalog = SnapshotCatalog {
            root: self.root,
            models: self.models,
            frame,
        };
        info!(
            "Catalog holds {} snapshots from {} of {} models",
            catalog.frame.height(),
            catalog.models_with_snapshots(),
            keys.len()
        );

        Ok(catalog)
    }
}

/// Catalog with one row per selected snapshot
#[derive(Debug, Clone)]
pub struct SnapshotCatalog {
    root: PathBuf,
    models: Vec<(String, ModelParams)>,
    frame: DataFrame,
}

impl SnapshotCatalog {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn models(&self) -> &[(String, ModelParams)] {
        &self.models
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Number of models contributing at least one snapshot
    pub fn models_with_snapshots(&self) -> usize {
        string_values(&self.frame, model_columns::KEY)
            .map(|keys| keys.into_iter().collect::<HashSet<_>>().len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapshotConfig;
    use crate::error::MatchError;
    use crate::table::float_values;
    use std::fs;
    use tempfile::TempDir;

    fn write_model(root: &Path, key: &str, times: &[f64]) {
        let dir = root.join(key);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("initial.conv.sh"),
            "massunitmsun=1.0\nlengthunitparsec=1.0\ntimeunitsmyr=1.0\n",
        )
        .unwrap();
        let mut content = String::from("# header\n#1.t #2.M #3.rc_spitzer #4.r_h\n");
        for t in times {
            content.push_str(&format!("{} 1e5 0.5 2.0\n", t));
        }
        fs::write(dir.join("initial.dyn.dat"), content).unwrap();
    }

    fn extractor() -> SnapshotExtractor {
        SnapshotExtractor::new(SnapshotConfig {
            time_min: 10.0,
            time_max: 20.0,
            target_count: 3,
            ..SnapshotConfig::default()
        })
        .with_workers(2)
    }

    #[tokio::test]
    async fn test_catalog_stages() {
        let temp_dir = TempDir::new().unwrap();
        write_model(temp_dir.path(), "N2e5_rv1_rg8_Z0.02", &[0.0, 10.0, 14.0, 20.0]);
        write_model(temp_dir.path(), "N1e5_rv1_rg8_Z0.0002_v2", &[0.0, 30.0]);

        let indexed = ModelCatalog::index(temp_dir.path(), "").await.unwrap();
        assert_eq!(indexed.len(), 2);

        let parsed = indexed
            .parse_names(&[], &NamingConvention::Kremer20)
            .unwrap();
        let params = parsed.params_frame().unwrap();
        assert_eq!(float_values(&params, "N").unwrap(), vec![100_000.0, 200_000.0]);

        let catalog = parsed.add_snapshots(&extractor()).await.unwrap();
        let frame = catalog.frame();

        // the second model has no rows in range and contributes nothing
        assert_eq!(frame.height(), 3);
        assert_eq!(catalog.models_with_snapshots(), 1);
        assert_eq!(
            string_values(frame, "fname").unwrap(),
            vec!["N2e5_rv1_rg8_Z0.02"; 3]
        );
        assert_eq!(float_values(frame, "snapshot").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(float_values(frame, "rg").unwrap(), vec![8.0; 3]);
        assert_eq!(float_values(frame, "Z").unwrap(), vec![0.02; 3]);
    }

    #[tokio::test]
    async fn test_archive_suffix_replacement_keeps_key() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("N1e5_rv1_rg8_Z0.02.tar.gz"), "archive").unwrap();

        let parsed = ModelCatalog::index(temp_dir.path(), ".tar.gz")
            .await
            .unwrap()
            .parse_names(
                &[(".tar.gz".to_string(), String::new())],
                &NamingConvention::Kremer20,
            )
            .unwrap();

        assert_eq!(parsed.models()[0].0, "N1e5_rv1_rg8_Z0.02.tar.gz");
        assert_eq!(parsed.models()[0].1.rg, 8.0);
    }

    #[tokio::test]
    async fn test_unparseable_name_fails_parse_stage() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("notes")).unwrap();

        let indexed = ModelCatalog::index(temp_dir.path(), "").await.unwrap();
        assert!(matches!(
            indexed.parse_names(&[], &NamingConvention::Kremer20),
            Err(MatchError::InvalidModelName { .. })
        ));
    }
}
