//! Configuration management and validation.
//!
//! Provides configuration structures for catalog indexing, snapshot
//! extraction, observational table loading, matching and output. The
//! defaults reproduce a standard Kremer+20 versus Baumgardt/Harris run.

use crate::constants::{
    DEFAULT_TARGET_COUNT, DEFAULT_TIME_MAX_MYR, DEFAULT_TIME_MIN_MYR, DYNAMICS_FILE,
    MATCHED_OUTPUT_FILE, MODEL_OUTPUT_FILE, OBSERVED_OUTPUT_FILE, SOLAR_METALLICITY,
    UNMEASURED_METALLICITY, derived_columns, model_columns, observed_columns,
};
use crate::error::{MatchError, Result};
use crate::models::{FileFormat, NamingConvention};
use crate::reader::LoadOverrides;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How model directories are recognized and named
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Suffix a directory entry must carry to count as a model
    pub extension: String,

    /// Literal (from, to) substitutions applied to names before parsing
    pub replacements: Vec<(String, String)>,

    /// Naming scheme of the model names
    pub convention: NamingConvention,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            extension: String::new(),
            replacements: Vec::new(),
            convention: NamingConvention::Kremer20,
        }
    }
}

/// Which rows of each model's time series become snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Time-series file read from every model directory
    pub file_name: String,

    pub format: FileFormat,

    pub time_column: String,

    /// Unit expression the time column is converted to
    pub time_unit: String,

    /// Closed target-time range, in `time_unit`
    pub time_min: f64,
    pub time_max: f64,

    /// Number of evenly spaced target times
    pub target_count: usize,

    /// Columns loaded besides the time column
    pub columns: Vec<String>,

    /// Column to unit expression, applied after the time conversion
    pub conversions: BTreeMap<String, String>,

    /// Reader overrides for the time-series file; the column selection is
    /// always taken from `time_column` and `columns`
    #[serde(default)]
    pub overrides: LoadOverrides,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        let columns = vec![
            model_columns::MASS.to_string(),
            model_columns::CORE_RADIUS.to_string(),
            model_columns::HALF_MASS_RADIUS.to_string(),
        ];
        let conversions = [
            (model_columns::MASS, "msun"),
            (model_columns::CORE_RADIUS, "pc"),
            (model_columns::HALF_MASS_RADIUS, "pc"),
        ]
        .into_iter()
        .map(|(column, unit)| (column.to_string(), unit.to_string()))
        .collect();

        Self {
            file_name: DYNAMICS_FILE.to_string(),
            format: FileFormat::Dynamics,
            time_column: model_columns::TIME.to_string(),
            time_unit: "myr".to_string(),
            time_min: DEFAULT_TIME_MIN_MYR,
            time_max: DEFAULT_TIME_MAX_MYR,
            target_count: DEFAULT_TARGET_COUNT,
            columns,
            conversions,
            overrides: LoadOverrides::default(),
        }
    }
}

impl SnapshotConfig {
    /// Per-file overrides with the time column plus the extra columns selected
    pub fn load_overrides(&self) -> LoadOverrides {
        let mut columns = vec![self.time_column.clone()];
        columns.extend(
            self.columns
                .iter()
                .filter(|column| **column != self.time_column)
                .cloned(),
        );
        self.overrides.clone().with_columns(columns)
    }
}

/// Column layout of the two observational tables
///
/// Role columns are renamed to the canonical [`observed_columns`] names once
/// the tables are joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedConfig {
    pub key_column: String,

    pub mass_column: String,
    pub core_radius_column: String,
    pub half_mass_radius_column: String,

    /// Galactocentric radius column
    pub radius_column: String,

    /// Further structural columns carried through unchanged
    pub extra_columns: Vec<String>,

    /// Metallicity column of the metallicity table
    pub metallicity_column: String,

    /// Metallicity value meaning "not measured"
    pub unmeasured_metallicity: f64,
}

impl Default for ObservedConfig {
    fn default() -> Self {
        Self {
            key_column: observed_columns::KEY.to_string(),
            mass_column: observed_columns::MASS.to_string(),
            core_radius_column: observed_columns::CORE_RADIUS.to_string(),
            half_mass_radius_column: observed_columns::HALF_MASS_RADIUS.to_string(),
            radius_column: observed_columns::GALACTOCENTRIC_RADIUS.to_string(),
            extra_columns: Vec::new(),
            metallicity_column: observed_columns::METALLICITY.to_string(),
            unmeasured_metallicity: UNMEASURED_METALLICITY,
        }
    }
}

impl ObservedConfig {
    /// Columns loaded from the structural-parameter table, key first
    pub fn structural_columns(&self) -> Vec<String> {
        let mut columns = vec![
            self.key_column.clone(),
            self.mass_column.clone(),
            self.core_radius_column.clone(),
            self.half_mass_radius_column.clone(),
            self.radius_column.clone(),
        ];
        for column in &self.extra_columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        columns
    }

    /// (configured, canonical) name pairs for the role columns
    pub fn canonical_names(&self) -> [(&str, &'static str); 5] {
        [
            (self.mass_column.as_str(), observed_columns::MASS),
            (self.core_radius_column.as_str(), observed_columns::CORE_RADIUS),
            (
                self.half_mass_radius_column.as_str(),
                observed_columns::HALF_MASS_RADIUS,
            ),
            (self.radius_column.as_str(), observed_columns::GALACTOCENTRIC_RADIUS),
            (self.metallicity_column.as_str(), observed_columns::METALLICITY),
        ]
    }
}

/// Comparison space of the matching engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Derived columns the distance is computed over
    pub comparison_columns: Vec<String>,

    pub solar_metallicity: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            comparison_columns: vec![
                derived_columns::LOG_MASS.to_string(),
                derived_columns::RADIUS_RATIO.to_string(),
            ],
            solar_metallicity: SOLAR_METALLICITY,
        }
    }
}

/// Where and how result tables are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub observed_file: String,
    pub model_file: String,
    pub matched_file: String,
    pub separator: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            observed_file: OBSERVED_OUTPUT_FILE.to_string(),
            model_file: MODEL_OUTPUT_FILE.to_string(),
            matched_file: MATCHED_OUTPUT_FILE.to_string(),
            separator: b' ',
        }
    }
}

/// Global configuration for a matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub catalog: CatalogConfig,
    pub snapshots: SnapshotConfig,
    pub observed: ObservedConfig,
    pub matching: MatchingConfig,
    pub output: OutputConfig,

    /// Maximum models read concurrently
    pub workers: usize,

    /// Show a per-model progress bar during snapshot extraction
    pub show_progress: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            snapshots: SnapshotConfig::default(),
            observed: ObservedConfig::default(),
            matching: MatchingConfig::default(),
            output: OutputConfig::default(),
            workers: num_cpus::get(),
            show_progress: false,
        }
    }
}

impl MatcherConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    /// Write result tables into `directory`
    pub fn with_output_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.output.directory = directory.into();
        self
    }

    /// Only directory entries ending in `extension` are models
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.catalog.extension = extension.into();
        self
    }

    pub fn with_replacement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.catalog.replacements.push((from.into(), to.into()));
        self
    }

    /// Closed target-time range and number of targets within it
    pub fn with_time_targets(mut self, min: f64, max: f64, count: usize) -> Self {
        self.snapshots.time_min = min;
        self.snapshots.time_max = max;
        self.snapshots.target_count = count;
        self
    }

    pub fn with_snapshot_config(mut self, snapshots: SnapshotConfig) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_comparison_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.matching.comparison_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Reject settings no run could complete with
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| -> Result<()> {
            Err(MatchError::Configuration {
                message: message.to_string(),
            })
        };

        if self.workers == 0 {
            return fail("workers must be at least 1");
        }
        if self.snapshots.target_count == 0 {
            return fail("target count must be at least 1");
        }
        if self.snapshots.time_min.is_nan()
            || self.snapshots.time_max.is_nan()
            || self.snapshots.time_min > self.snapshots.time_max
        {
            return fail("target time range is inverted");
        }
        if self.matching.comparison_columns.is_empty() {
            return fail("comparison column set is empty");
        }
        Ok(())
    }
}
