//! Application constants for the CMC catalog matcher
//!
//! File names, column names and physical reference values shared by the
//! catalog builders and the matching engine.

// =============================================================================
// CMC Model Output Files
// =============================================================================

/// Unit-definition script written next to every CMC model's output
pub const UNIT_DEFINITION_FILE: &str = "initial.conv.sh";

/// Dynamical time-series output of a CMC model
pub const DYNAMICS_FILE: &str = "initial.dyn.dat";

/// Separator between a column's namespace prefix and its name (`#1:t`)
pub const NAMESPACE_SEPARATOR: char = ':';

/// Version suffix stripped from Kremer+20 model names
pub const MODEL_VERSION_SUFFIX: &str = "_v2";

/// Delimiter between the tokens of a model name
pub const MODEL_NAME_DELIMITER: char = '_';

// =============================================================================
// Catalog Column Names
// =============================================================================

/// Column names of the flat model-snapshot table
pub mod model_columns {
    /// Model lookup key (directory name as found on disk)
    pub const KEY: &str = "fname";

    /// 0-based row ordinal of a snapshot within its time-series file
    pub const SNAPSHOT: &str = "snapshot";

    /// Target time a snapshot was selected for
    pub const TARGET_TIME: &str = "t_target";

    pub const N: &str = "N";
    pub const RV: &str = "rv";
    pub const RG: &str = "rg";
    pub const Z: &str = "Z";

    /// Simulation time column of CMC dynamics files
    pub const TIME: &str = "t";

    pub const MASS: &str = "M";
    pub const CORE_RADIUS: &str = "rc_spitzer";
    pub const HALF_MASS_RADIUS: &str = "r_h";
}

/// Column names of the observational tables
pub mod observed_columns {
    pub const KEY: &str = "Cluster";
    pub const MASS: &str = "Mass";
    pub const CORE_RADIUS: &str = "rc";
    pub const HALF_MASS_RADIUS: &str = "rh,m";
    pub const GALACTOCENTRIC_RADIUS: &str = "R_GC";
    pub const METALLICITY: &str = "[Fe/H]";
}

/// Derived comparison columns shared by both catalogs
pub mod derived_columns {
    pub const LOG_MASS: &str = "logM";
    pub const RADIUS_RATIO: &str = "rc/rh";
    pub const METALLICITY: &str = "[Fe/H]";
}

// =============================================================================
// Physical Reference Values
// =============================================================================

/// Solar metallicity used to convert Z to [Fe/H]
pub const SOLAR_METALLICITY: f64 = 0.02;

/// Harris catalog marker for clusters without a metallicity measurement
pub const UNMEASURED_METALLICITY: f64 = -100.0;

// =============================================================================
// Default Snapshot Selection
// =============================================================================

/// Default target age window in Myr
pub const DEFAULT_TIME_MIN_MYR: f64 = 10_000.0;
pub const DEFAULT_TIME_MAX_MYR: f64 = 13_500.0;

/// Default number of evenly spaced target ages
pub const DEFAULT_TARGET_COUNT: usize = 10;

// =============================================================================
// Output Artifacts
// =============================================================================

pub const OBSERVED_OUTPUT_FILE: &str = "gcs.dat";
pub const MODEL_OUTPUT_FILE: &str = "cmcs.dat";
pub const MATCHED_OUTPUT_FILE: &str = "gcs-cmc.dat";
