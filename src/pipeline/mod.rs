//! End-to-end matching run.
//!
//! Orchestrates the complete workflow: load and join the observational
//! tables, build the CMC snapshot catalog, derive comparison columns, match
//! and write the three result tables.

#[cfg(test)]
pub mod tests;

use crate::catalog::ModelCatalog;
use crate::catalog::snapshots::SnapshotExtractor;
use crate::config::MatcherConfig;
use crate::error::{MatchError, Result};
use crate::matching::{MatchingEngine, derive_model_columns, derive_observed_columns};
use crate::models::MatchStats;
use crate::observed::ObservedCatalogLoader;
use crate::writer::TableWriter;

use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Tables produced by a run, before anything is written
#[derive(Debug, Clone)]
pub struct MatchTables {
    /// Observed clusters with derived columns
    pub observed: DataFrame,
    /// Model snapshots with derived columns
    pub models: DataFrame,
    /// Matched clusters
    pub matched: DataFrame,
    pub stats: MatchStats,
}

/// Pipeline from raw catalogs to matched clusters
#[derive(Debug, Clone)]
pub struct MatchPipeline {
    catalog_path: PathBuf,
    structural_path: PathBuf,
    metallicity_path: PathBuf,
    config: MatcherConfig,
}

impl MatchPipeline {
    /// Pipeline over a CMC catalog directory and the two observational tables
    pub fn new(
        catalog_path: impl Into<PathBuf>,
        structural_path: impl Into<PathBuf>,
        metallicity_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let catalog_path = catalog_path.into();
        let structural_path = structural_path.into();
        let metallicity_path = metallicity_path.into();

        for path in [&catalog_path, &structural_path, &metallicity_path] {
            if !path.exists() {
                return Err(MatchError::DatasetNotFound { path: path.clone() });
            }
        }

        Ok(Self {
            catalog_path,
            structural_path,
            metallicity_path,
            config: MatcherConfig::default(),
        })
    }

    pub fn with_config(mut self, config: MatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    /// Observed catalog with `logM` and `rc/rh`
    pub fn build_observed(&self) -> Result<DataFrame> {
        let loader = ObservedCatalogLoader::new(self.config.observed.clone());
        let observed = loader.load(&self.structural_path, &self.metallicity_path)?;
        derive_observed_columns(&observed)
    }

    /// Model snapshot catalog with `[Fe/H]`, `logM` and `rc/rh`
    ///
    /// Also returns the number of indexed models and of models that
    /// contributed snapshots.
    pub async fn build_models(&self) -> Result<(DataFrame, usize, usize)> {
        let catalog_config = &self.config.catalog;
        let extractor = SnapshotExtractor::new(self.config.snapshots.clone())
            .with_workers(self.config.workers)
            .with_progress(self.config.show_progress);

        let indexed = ModelCatalog::index(&self.catalog_path, &catalog_config.extension).await?;
        let models_indexed = indexed.len();
        let catalog = indexed
            .parse_names(&catalog_config.replacements, &catalog_config.convention)?
            .add_snapshots(&extractor)
            .await?;
        let models_with_snapshots = catalog.models_with_snapshots();

        let models = derive_model_columns(catalog.frame(), self.config.matching.solar_metallicity)?;
        Ok((models, models_indexed, models_with_snapshots))
    }

    /// Build every table and match, without writing anything
    pub async fn build_tables(&self) -> Result<MatchTables> {
        let start_time = Instant::now();
        self.config.validate()?;

        info!("Loading observed catalog");
        let observed = self.build_observed()?;

        info!("Building model catalog from {}", self.catalog_path.display());
        let (models, models_indexed, models_with_snapshots) = self.build_models().await?;

        info!("Matching {} clusters to {} snapshots", observed.height(), models.height());
        let engine = MatchingEngine::new(&self.config.matching)
            .with_time_column(self.config.snapshots.time_column.clone());
        let outcome = engine.match_catalogs(&observed, &models)?;

        let stats = MatchStats {
            models_indexed,
            models_with_snapshots,
            snapshots: models.height(),
            observed_clusters: observed.height(),
            matched_clusters: outcome.frame.height(),
            bins_searched: outcome.bins_searched,
            output_dir: None,
            processing_time_ms: start_time.elapsed().as_millis(),
        };

        Ok(MatchTables {
            observed,
            models,
            matched: outcome.frame,
            stats,
        })
    }

    /// Main entry point: build, match and write all result tables
    pub async fn run(&self) -> Result<MatchStats> {
        let start_time = Instant::now();
        let tables = self.build_tables().await?;

        let output = &self.config.output;
        let writer = TableWriter::from_config(output);
        writer.write(&tables.observed, &output.observed_file)?;
        writer.write(&tables.models, &output.model_file)?;
        writer.write(&tables.matched, &output.matched_file)?;

        let stats = MatchStats {
            output_dir: Some(writer.output_dir().to_path_buf()),
            processing_time_ms: start_time.elapsed().as_millis(),
            ..tables.stats
        };

        info!(
            "Matched {} of {} clusters in {}ms; results in {}",
            stats.matched_clusters,
            stats.observed_clusters,
            stats.processing_time_ms,
            writer.output_dir().display()
        );

        Ok(stats)
    }
}
