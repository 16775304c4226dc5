//! Core data structures and types for catalog matching.
//!
//! Defines file format variants, model parameters parsed from CMC model
//! names, naming conventions and pipeline statistics.

use crate::constants::{MODEL_NAME_DELIMITER, NAMESPACE_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Output file layouts understood by the tabular reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    /// CMC `*.dyn.dat`: headers on the second line as `#1.t #2.Dt ...`
    Dynamics,
    /// Other CMC outputs: headers on the first line as `#1:t #2:...`
    Generic,
    /// Plain tables whose first line holds bare column names
    Plain,
}

impl FileFormat {
    /// Zero-based index of the header line
    pub fn header_line(&self) -> usize {
        match self {
            FileFormat::Dynamics => 1,
            FileFormat::Generic | FileFormat::Plain => 0,
        }
    }

    /// Characters rewritten to the namespace separator before splitting
    pub fn separator_aliases(&self) -> Vec<char> {
        match self {
            FileFormat::Dynamics => vec!['.'],
            FileFormat::Generic | FileFormat::Plain => Vec::new(),
        }
    }

    /// Separator between namespace prefix and column name, if any
    pub fn namespace_separator(&self) -> Option<char> {
        match self {
            FileFormat::Dynamics | FileFormat::Generic => Some(NAMESPACE_SEPARATOR),
            FileFormat::Plain => None,
        }
    }
}

/// Naming schemes for directories in a CMC model catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamingConvention {
    /// `N<count>_rv<rv>_rg<rg>_Z<z>` with an optional `_v2` suffix
    Kremer20,
    /// Any scheme this crate does not know how to parse
    Other(String),
}

impl NamingConvention {
    /// Resolve a convention from its published name ("Kremer+20")
    pub fn from_name(name: &str) -> Self {
        match name {
            "Kremer+20" | "Kremer20" | "kremer20" => NamingConvention::Kremer20,
            other => NamingConvention::Other(other.to_string()),
        }
    }
}

impl fmt::Display for NamingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingConvention::Kremer20 => write!(f, "Kremer+20"),
            NamingConvention::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Initial conditions of one CMC model, parsed from its name
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Initial particle count
    pub n: i64,
    /// Initial virial radius (pc)
    pub rv: f64,
    /// Galactocentric radius (kpc)
    pub rg: f64,
    /// Metallicity
    pub z: f64,
}

impl fmt::Display for ModelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = MODEL_NAME_DELIMITER;
        write!(
            f,
            "N{}{d}rv{}{d}rg{}{d}Z{}",
            self.n, self.rv, self.rg, self.z
        )
    }
}

/// Statistics reported by a complete matching run
#[derive(Debug, Clone, Default)]
pub struct MatchStats {
    pub models_indexed: usize,
    pub models_with_snapshots: usize,
    pub snapshots: usize,
    pub observed_clusters: usize,
    pub matched_clusters: usize,
    pub bins_searched: usize,
    pub output_dir: Option<PathBuf>,
    pub processing_time_ms: u128,
}
