//! CMC Matcher Library
//!
//! A Rust library for matching Milky Way globular clusters to their nearest
//! counterparts in a catalog of CMC (Cluster Monte Carlo) star-cluster
//! models.
//!
//! This library provides tools for:
//! - Reading CMC output files with namespaced column headers
//! - Converting code units to physical units from `initial.conv.sh`
//! - Indexing a model catalog and parsing initial conditions from names
//! - Selecting model snapshots nearest a set of target ages, in parallel
//! - Joining Baumgardt and Harris style observational tables
//! - Binned nearest-neighbour matching in (log mass, rc/rh) space

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod logging;
pub mod matching;
pub mod models;
pub mod observed;
pub mod pipeline;
pub mod reader;
pub mod table;
pub mod units;
pub mod writer;

// Re-export commonly used types
pub use catalog::{IndexedCatalog, ModelCatalog, ParsedCatalog, SnapshotCatalog};
pub use catalog::snapshots::SnapshotExtractor;
pub use config::MatcherConfig;
pub use error::{MatchError, Result};
pub use matching::{MatchOutcome, MatchingEngine};
pub use models::{FileFormat, MatchStats, ModelParams, NamingConvention};
pub use observed::ObservedCatalogLoader;
pub use pipeline::{MatchPipeline, MatchTables};
pub use reader::{LoadOverrides, TabularFileReader};
pub use units::{ConvScriptUnits, UnitDictionary, UnitDictionaryBuilder, UnitTable};
