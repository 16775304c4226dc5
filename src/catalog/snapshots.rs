//! Snapshot extraction for CMC model catalogs
//!
//! Every model is read independently: its time-series file is loaded, unit
//! converted against the model's own `initial.conv.sh`, and reduced to the
//! rows nearest a set of evenly spaced target times. Models run on a
//! bounded pool of blocking tasks.

use crate::config::SnapshotConfig;
use crate::constants::model_columns;
use crate::error::{MatchError, Result};
use crate::reader::TabularFileReader;
use crate::table::{float_values, set_float_column, take_rows};
use crate::units::{ConvScriptUnits, UnitTable};

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, warn};

/// `count` evenly spaced values over `[min, max]`, endpoints included
pub fn target_times(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { max } else { min + step * i as f64 })
                .collect()
        }
    }
}

/// Index into `times` of the value nearest each target
///
/// Ties go to the smallest index; NaN times never win. Returns an empty
/// vector when no time is comparable.
pub fn nearest_indices(times: &[f64], targets: &[f64]) -> Vec<usize> {
    if !times.iter().any(|t| !t.is_nan()) {
        return Vec::new();
    }

    targets
        .iter()
        .filter_map(|&target| {
            let mut best: Option<(usize, f64)> = None;
            for (i, &time) in times.iter().enumerate() {
                let distance = (time - target).abs();
                if distance.is_nan() {
                    continue;
                }
                if best.is_none_or(|(_, d)| distance < d) {
                    best = Some((i, distance));
                }
            }
            best.map(|(i, _)| i)
        })
        .collect()
}

/// Rows (by ordinal) selected for each target, with the target they serve
///
/// Only rows whose time lies in `[min, max]` are candidates.
pub fn select_snapshot_rows(times: &[f64], min: f64, max: f64, count: usize) -> Vec<(usize, f64)> {
    let candidates: Vec<usize> = (0..times.len())
        .filter(|&i| times[i] >= min && times[i] <= max)
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let candidate_times: Vec<f64> = candidates.iter().map(|&i| times[i]).collect();
    let targets = target_times(min, max, count);

    nearest_indices(&candidate_times, &targets)
        .into_iter()
        .zip(targets)
        .map(|(local, target)| (candidates[local], target))
        .collect()
}

/// Snapshot rows of one model
///
/// Columns: model key, snapshot ordinal, target time, then the loaded
/// columns (all `Float64`). A model without in-range rows yields an empty
/// frame with the same columns.
pub fn extract_model_snapshots(root: &Path, key: &str, config: &SnapshotConfig) -> Result<DataFrame> {
    let path = root.join(key).join(&config.file_name);
    debug!("Extracting snapshots from {}", path.display());

    let reader = TabularFileReader::new(config.format);
    let frame = reader.read(&path, &config.load_overrides())?;

    let mut table = UnitTable::new(frame, Some(path.clone()));
    let units = table.sibling_units(&ConvScriptUnits)?;
    let time_request = BTreeMap::from([(config.time_column.clone(), config.time_unit.clone())]);
    table.convert(&time_request, Some(&units), false)?;
    table.convert(&config.conversions, Some(&units), false)?;
    let frame = table.into_frame();

    let times = float_values(&frame, &config.time_column)?;
    let selected = select_snapshot_rows(&times, config.time_min, config.time_max, config.target_count);
    if selected.is_empty() {
        warn!(
            "Model {} has no rows between {} and {}",
            key, config.time_min, config.time_max
        );
    }

    let rows: Vec<usize> = selected.iter().map(|(row, _)| *row).collect();
    let mut snapshot_rows = take_rows(&frame, &rows)?;
    let names: Vec<String> = snapshot_rows
        .get_column_names_str()
        .into_iter()
        .map(str::to_string)
        .collect();
    for name in &names {
        let values = float_values(&snapshot_rows, name)?;
        set_float_column(&mut snapshot_rows, name, values)?;
    }

    let mut columns = vec![
        Column::new(model_columns::KEY.into(), vec![key.to_string(); rows.len()]),
        Column::new(
            model_columns::SNAPSHOT.into(),
            rows.iter().map(|&row| row as i64).collect::<Vec<i64>>(),
        ),
        Column::new(
            model_columns::TARGET_TIME.into(),
            selected.iter().map(|(_, target)| *target).collect::<Vec<f64>>(),
        ),
    ];
    columns.extend(snapshot_rows.get_columns().iter().cloned());

    Ok(DataFrame::new(columns)?)
}

/// Bounded worker pool extracting snapshots for every model of a catalog
#[derive(Debug, Clone)]
pub struct SnapshotExtractor {
    config: Arc<SnapshotConfig>,
    workers: usize,
    show_progress: bool,
}

impl SnapshotExtractor {
    pub fn new(config: SnapshotConfig) -> Self {
        Self {
            config: Arc::new(config),
            workers: num_cpus::get(),
            show_progress: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Extracting snapshots");
        pb
    }

    /// Extract and concatenate snapshots of all `keys` under `root`
    ///
    /// Output keeps the order of `keys`. The first failing model aborts the
    /// batch with its key attached.
    pub async fn extract_all(&self, root: &Path, keys: &[String]) -> Result<DataFrame> {
        if keys.is_empty() {
            return Err(MatchError::Configuration {
                message: "no models to extract snapshots from".to_string(),
            });
        }

        let pb = self.progress_bar(keys.len());
        self.extract_with_progress(root, keys, &pb).await
    }

    /// Run the worker pool, reporting on `pb`; the bar is finished or
    /// abandoned before this returns
    async fn extract_with_progress(
        &self,
        root: &Path,
        keys: &[String],
        pb: &ProgressBar,
    ) -> Result<DataFrame> {
        let limit = self.workers.min(keys.len()).max(1);
        debug!("Extracting snapshots from {} models with {} workers", keys.len(), limit);

        let frames = stream::iter(keys.iter().cloned())
            .map(|key| {
                let root: PathBuf = root.to_path_buf();
                let config = Arc::clone(&self.config);
                let pb = pb.clone();
                async move {
                    pb.set_message(format!("Extracting: {}", key));
                    let result = task::spawn_blocking({
                        let key = key.clone();
                        move || extract_model_snapshots(&root, &key, &config)
                    })
                    .await
                    .map_err(|e| MatchError::Io(std::io::Error::other(e)))
                    .and_then(|inner| inner);
                    pb.inc(1);

                    result.map_err(|source| MatchError::SnapshotExtraction {
                        model: key,
                        source: Box::new(source),
                    })
                }
            })
            .buffered(limit)
            .try_collect::<Vec<DataFrame>>()
            .await
            .inspect_err(|_| pb.abandon_with_message("Snapshot extraction failed"))?;

        pb.finish_with_message("All models processed");

        let lazy_frames: Vec<LazyFrame> = frames.into_iter().map(|frame| frame.lazy()).collect();
        let combined = concat_lf_diagonal(lazy_frames, UnionArgs::default())?.collect()?;
        debug!("Extracted {} snapshots", combined.height());

        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::LoadOverrides;
    use crate::table::string_values;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_target_times_inclusive() {
        assert_eq!(target_times(10.0, 20.0, 3), vec![10.0, 15.0, 20.0]);
        assert_eq!(target_times(10.0, 20.0, 1), vec![10.0]);
        assert!(target_times(10.0, 20.0, 0).is_empty());

        let targets = target_times(10_000.0, 13_500.0, 10);
        assert_eq!(targets.len(), 10);
        assert_eq!(targets[0], 10_000.0);
        assert_eq!(targets[9], 13_500.0);
    }

    #[test]
    fn test_duplicate_targets_share_a_snapshot() {
        let times = [0.0, 5000.0, 10000.0, 13000.0];
        assert_eq!(nearest_indices(&times, &[9000.0, 11000.0]), vec![2, 2]);
    }

    #[test]
    fn test_nearest_ties_go_to_first_row() {
        let times = [4.0, 6.0, 6.0];
        assert_eq!(nearest_indices(&times, &[5.0, 6.0]), vec![0, 1]);
    }

    #[test]
    fn test_nan_times_never_win() {
        let times = [f64::NAN, 7.0];
        assert_eq!(nearest_indices(&times, &[0.0]), vec![1]);
        assert!(nearest_indices(&[f64::NAN], &[0.0]).is_empty());
    }

    #[test]
    fn test_select_restricts_to_range() {
        let times = [0.0, 5000.0, 10000.0, 13000.0];
        let selected = select_snapshot_rows(&times, 9000.0, 11000.0, 2);
        assert_eq!(selected, vec![(2, 9000.0), (2, 11000.0)]);

        assert!(select_snapshot_rows(&times, 20000.0, 30000.0, 5).is_empty());
    }

    fn write_model(root: &Path, key: &str, rows: &[(f64, f64)]) {
        let dir = root.join(key);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("initial.conv.sh"),
            "massunitmsun=1000.0\nlengthunitparsec=2.0\ntimeunitsmyr=10.0\n",
        )
        .unwrap();

        let mut content = String::from("# Dynamical information [code units]\n");
        content.push_str("#1.t #2.M #3.rc_spitzer #4.r_h\n");
        for (t, m) in rows {
            content.push_str(&format!("{} {} 0.1 0.5\n", t, m));
        }
        fs::write(dir.join("initial.dyn.dat"), content).unwrap();
    }

    fn test_config() -> SnapshotConfig {
        SnapshotConfig {
            time_min: 100.0,
            time_max: 200.0,
            target_count: 2,
            ..SnapshotConfig::default()
        }
    }

    #[test]
    fn test_extract_model_snapshots() {
        let temp_dir = TempDir::new().unwrap();
        write_model(
            temp_dir.path(),
            "N1e5_rv1_rg8_Z0.02",
            &[(0.0, 1.0), (9.0, 0.9), (15.0, 0.8), (21.0, 0.7)],
        );

        let frame =
            extract_model_snapshots(temp_dir.path(), "N1e5_rv1_rg8_Z0.02", &test_config()).unwrap();

        assert_eq!(
            frame.get_column_names_str(),
            vec!["fname", "snapshot", "t_target", "t", "M", "rc_spitzer", "r_h"]
        );
        // converted times: 0, 90, 150, 210; only 150 lies within [100, 200]
        assert_eq!(float_values(&frame, "t").unwrap(), vec![150.0, 150.0]);
        assert_eq!(float_values(&frame, "snapshot").unwrap(), vec![2.0, 2.0]);
        assert_eq!(float_values(&frame, "t_target").unwrap(), vec![100.0, 200.0]);
        assert_eq!(float_values(&frame, "M").unwrap(), vec![800.0, 800.0]);
        assert_eq!(float_values(&frame, "r_h").unwrap(), vec![1.0, 1.0]);
    }

    #[tokio::test]
    async fn test_extract_all_keeps_model_order() {
        let temp_dir = TempDir::new().unwrap();
        write_model(temp_dir.path(), "b", &[(10.0, 1.0), (20.0, 1.0)]);
        write_model(temp_dir.path(), "a", &[(12.0, 1.0)]);
        write_model(temp_dir.path(), "c", &[(1.0, 1.0)]);

        let extractor = SnapshotExtractor::new(test_config()).with_workers(2);
        let keys = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        let frame = extractor.extract_all(temp_dir.path(), &keys).await.unwrap();

        assert_eq!(frame.height(), 4);
        assert_eq!(
            string_values(&frame, "fname").unwrap(),
            vec!["b", "b", "a", "a"]
        );
    }

    #[tokio::test]
    async fn test_failure_names_the_model() {
        let temp_dir = TempDir::new().unwrap();
        write_model(temp_dir.path(), "good", &[(10.0, 1.0)]);
        fs::write(temp_dir.path().join("archived.tar.gz"), "not a directory").unwrap();

        let extractor = SnapshotExtractor::new(test_config()).with_workers(1);
        let keys = vec!["good".to_string(), "archived.tar.gz".to_string()];

        match extractor.extract_all(temp_dir.path(), &keys).await.unwrap_err() {
            MatchError::SnapshotExtraction { model, source } => {
                assert_eq!(model, "archived.tar.gz");
                assert!(matches!(*source, MatchError::Io(_)));
            }
            other => panic!("Expected SnapshotExtraction error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_stops_progress_bar() {
        let temp_dir = TempDir::new().unwrap();
        write_model(temp_dir.path(), "good", &[(10.0, 1.0)]);

        let extractor = SnapshotExtractor::new(test_config()).with_workers(1);
        let keys = vec!["good".to_string(), "missing".to_string()];
        let pb = ProgressBar::hidden();

        let result = extractor
            .extract_with_progress(temp_dir.path(), &keys, &pb)
            .await;
        assert!(result.is_err());
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 2);
    }

    #[test]
    fn test_custom_skip_rows_reach_the_reader() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("model");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("initial.conv.sh"),
            "timeunitsmyr=10.0\nmassunitmsun=1.0\nlengthunitparsec=1.0\n",
        )
        .unwrap();
        fs::write(
            dir.join("initial.dyn.dat"),
            "# Dynamical information [code units]\n\
             #1.t #2.M #3.rc_spitzer #4.r_h\n\
             restart marker\n\
             15.0 0.8 0.1 0.5\n\
             16.0 0.7 0.1 0.5\n",
        )
        .unwrap();

        assert!(extract_model_snapshots(temp_dir.path(), "model", &test_config()).is_err());

        let config = SnapshotConfig {
            overrides: LoadOverrides::default().with_skip_rows(3),
            ..test_config()
        };
        let frame = extract_model_snapshots(temp_dir.path(), "model", &config).unwrap();
        assert_eq!(float_values(&frame, "t").unwrap(), vec![150.0, 160.0]);
        assert_eq!(float_values(&frame, "snapshot").unwrap(), vec![0.0, 1.0]);
    }
}
