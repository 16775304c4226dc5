//! Delimited text output for catalog tables.
//!
//! Tables are written header first, one row per line, with a single-byte
//! separator. Column order is the order of the data frame.

use crate::config::OutputConfig;
use crate::error::Result;

use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writer for the catalog and match result tables
#[derive(Debug, Clone)]
pub struct TableWriter {
    output_dir: PathBuf,
    separator: u8,
}

impl TableWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            separator: b' ',
        }
    }

    /// Writer configured from the output section of the run configuration
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.directory.clone()).with_separator(config.separator)
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `frame` to `file_name` inside the output directory
    pub fn write(&self, frame: &DataFrame, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);

        let mut file = std::fs::File::create(&path)?;
        let mut frame = frame.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(self.separator)
            .finish(&mut frame)?;

        debug!(
            "Wrote {} rows x {} columns to {}",
            frame.height(),
            frame.width(),
            path.display()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use tempfile::TempDir;

    fn sample_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("Cluster".into(), vec!["NGC_104", "NGC_362"]),
            Column::new("logM".into(), vec![5.5f64, 5.25]),
            Column::new("snapshot".into(), vec![3i64, 11]),
        ])
        .unwrap()
    }

    #[test]
    fn test_write_space_separated() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TableWriter::new(temp_dir.path().join("out"));

        let path = writer.write(&sample_frame(), "gcs.dat").unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "Cluster logM snapshot");
        assert_eq!(lines[1], "NGC_104 5.5 3");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_custom_separator() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TableWriter::new(temp_dir.path()).with_separator(b',');

        let path = writer.write(&sample_frame(), "table.csv").unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("Cluster,logM,snapshot\n"));
    }
}
