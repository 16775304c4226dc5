//! Nearest-snapshot matching of observed clusters to CMC models.
//!
//! Both catalogs are binned on galactocentric radius and metallicity using
//! bins generated from the simulated values. Inside each bin every observed
//! cluster is assigned the model snapshot closest to it over the comparison
//! columns.

pub mod bins;
pub mod distance;

use self::bins::AxisBins;
use self::distance::nearest_models;

use crate::config::MatchingConfig;
use crate::constants::{derived_columns, model_columns, observed_columns};
use crate::error::Result;
use crate::table::{float_values, require_columns, set_float_column, take_rows};

use polars::prelude::*;
use tracing::{debug, info, warn};

/// Add `[Fe/H]`, `logM` and `rc/rh` to a model snapshot table
pub fn derive_model_columns(frame: &DataFrame, solar_metallicity: f64) -> Result<DataFrame> {
    let z = float_values(frame, model_columns::Z)?;
    let mass = float_values(frame, model_columns::MASS)?;
    let rc = float_values(frame, model_columns::CORE_RADIUS)?;
    let rh = float_values(frame, model_columns::HALF_MASS_RADIUS)?;

    let mut derived = frame.clone();
    set_float_column(
        &mut derived,
        derived_columns::METALLICITY,
        z.iter().map(|z| (z / solar_metallicity).log10()).collect(),
    )?;
    set_float_column(
        &mut derived,
        derived_columns::LOG_MASS,
        mass.iter().map(|m| m.log10()).collect(),
    )?;
    set_float_column(
        &mut derived,
        derived_columns::RADIUS_RATIO,
        rc.iter().zip(&rh).map(|(rc, rh)| rc / rh).collect(),
    )?;
    Ok(derived)
}

/// Add `logM` and `rc/rh` to an observed cluster table
pub fn derive_observed_columns(frame: &DataFrame) -> Result<DataFrame> {
    let mass = float_values(frame, observed_columns::MASS)?;
    let rc = float_values(frame, observed_columns::CORE_RADIUS)?;
    let rh = float_values(frame, observed_columns::HALF_MASS_RADIUS)?;

    let mut derived = frame.clone();
    set_float_column(
        &mut derived,
        derived_columns::LOG_MASS,
        mass.iter().map(|m| m.log10()).collect(),
    )?;
    set_float_column(
        &mut derived,
        derived_columns::RADIUS_RATIO,
        rc.iter().zip(&rh).map(|(rc, rh)| rc / rh).collect(),
    )?;
    Ok(derived)
}

/// Matched clusters plus bin bookkeeping
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Observed rows that found a match, with `fname`, `snapshot` and time
    pub frame: DataFrame,
    /// Bin pairs holding both clusters and snapshots
    pub bins_searched: usize,
    /// Bin pairs skipped for lack of clusters or snapshots
    pub bins_skipped: usize,
}

/// Binned nearest-neighbour matcher
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    comparison: Vec<String>,
    time_column: String,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new(&MatchingConfig::default())
    }
}

impl MatchingEngine {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            comparison: config.comparison_columns.clone(),
            time_column: model_columns::TIME.to_string(),
        }
    }

    /// Name of the model time column copied onto matches
    pub fn with_time_column(mut self, time_column: impl Into<String>) -> Self {
        self.time_column = time_column.into();
        self
    }

    pub fn comparison_columns(&self) -> &[String] {
        &self.comparison
    }

    /// Match every observed cluster to its nearest snapshot
    ///
    /// Both tables must already carry the derived columns. Output rows come
    /// radius bin first, then metallicity bin, then observed order. Clusters
    /// whose bin holds no snapshots are absent.
    pub fn match_catalogs(&self, observed: &DataFrame, models: &DataFrame) -> Result<MatchOutcome> {
        let mut observed_required = vec![
            observed_columns::GALACTOCENTRIC_RADIUS.to_string(),
            observed_columns::METALLICITY.to_string(),
        ];
        observed_required.extend(self.comparison.iter().cloned());
        require_columns(observed, &observed_required)?;

        let mut model_required = vec![
            model_columns::KEY.to_string(),
            model_columns::SNAPSHOT.to_string(),
            self.time_column.clone(),
            model_columns::RG.to_string(),
            derived_columns::METALLICITY.to_string(),
        ];
        model_required.extend(self.comparison.iter().cloned());
        require_columns(models, &model_required)?;

        let obs_radius = float_values(observed, observed_columns::GALACTOCENTRIC_RADIUS)?;
        let obs_metallicity = float_values(observed, observed_columns::METALLICITY)?;
        let model_radius = float_values(models, model_columns::RG)?;
        let model_metallicity = float_values(models, derived_columns::METALLICITY)?;

        let obs_params = self
            .comparison
            .iter()
            .map(|name| float_values(observed, name))
            .collect::<Result<Vec<_>>>()?;
        let model_params = self
            .comparison
            .iter()
            .map(|name| float_values(models, name))
            .collect::<Result<Vec<_>>>()?;

        let radius_bins = AxisBins::from_values(&model_radius);
        let metallicity_bins = AxisBins::from_values(&model_metallicity);
        debug!(
            "Matching over {} radius x {} metallicity bins",
            radius_bins.len(),
            metallicity_bins.len()
        );

        let mut cluster_rows = Vec::new();
        let mut model_rows = Vec::new();
        let mut bins_searched = 0usize;
        let mut bins_skipped = 0usize;

        for radius_bin in radius_bins.iter() {
            for metallicity_bin in metallicity_bins.iter() {
                let clusters: Vec<usize> = (0..observed.height())
                    .filter(|&i| {
                        radius_bin.contains(obs_radius[i])
                            && metallicity_bin.contains(obs_metallicity[i])
                    })
                    .collect();
                let snapshots: Vec<usize> = (0..models.height())
                    .filter(|&j| {
                        model_radius[j] == radius_bin.value
                            && model_metallicity[j] == metallicity_bin.value
                    })
                    .collect();

                if clusters.is_empty() || snapshots.is_empty() {
                    debug!(
                        "Skipping bin rg={} [Fe/H]={}: {} clusters, {} snapshots",
                        radius_bin.value,
                        metallicity_bin.value,
                        clusters.len(),
                        snapshots.len()
                    );
                    bins_skipped += 1;
                    continue;
                }
                bins_searched += 1;

                let subset = |params: &[Vec<f64>], rows: &[usize]| -> Vec<Vec<f64>> {
                    params
                        .iter()
                        .map(|values| rows.iter().map(|&r| values[r]).collect())
                        .collect()
                };
                let nearest = nearest_models(
                    &subset(&obs_params, &clusters),
                    &subset(&model_params, &snapshots),
                );

                for (&cluster, best) in clusters.iter().zip(nearest) {
                    match best {
                        Some(local) => {
                            cluster_rows.push(cluster);
                            model_rows.push(snapshots[local]);
                        }
                        None => warn!(
                            "Cluster at row {} has no finite distance to any snapshot",
                            cluster
                        ),
                    }
                }
            }
        }

        let matched = take_rows(observed, &cluster_rows)?;
        let winners = take_rows(models, &model_rows)?.select([
            model_columns::KEY,
            model_columns::SNAPSHOT,
            self.time_column.as_str(),
        ])?;
        let frame = matched.hstack(winners.get_columns())?;

        info!(
            "Matched {} of {} clusters across {} bins",
            frame.height(),
            observed.height(),
            bins_searched
        );

        Ok(MatchOutcome {
            frame,
            bins_searched,
            bins_skipped,
        })
    }
}
