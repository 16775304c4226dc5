//! Eager reader for whitespace-delimited scientific tables.
//!
//! A single configurable reader covers every file layout the catalogs use.
//! The [`FileFormat`] picks the header line, separator aliases and default
//! row skip; [`LoadOverrides`] lets callers replace any of the defaults for
//! one read.

use crate::error::{MatchError, Result};
use crate::header::{HeaderSpec, parse_column_names};
use crate::models::FileFormat;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Field delimiter of data rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    /// Any run of whitespace
    Whitespace,
    /// One specific character; fields are trimmed
    Char(char),
}

/// Resolved options for one table read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub delimiter: Delimiter,
    /// Lines skipped from the start of the file before data begins
    pub skip_rows: usize,
    /// Columns to keep (header order is preserved); `None` keeps all
    pub columns: Option<Vec<String>>,
    /// Columns always loaded as strings
    pub text_columns: Vec<String>,
    /// Upper bound on data rows read
    pub max_rows: Option<usize>,
}

impl LoadOptions {
    /// Defaults for a file layout: data starts right after the header
    pub fn defaults_for(format: FileFormat) -> Self {
        Self {
            delimiter: Delimiter::Whitespace,
            skip_rows: format.header_line() + 1,
            columns: None,
            text_columns: Vec::new(),
            max_rows: None,
        }
    }

    /// Merge caller overrides over these options
    pub fn merged(mut self, overrides: &LoadOverrides) -> Self {
        if let Some(delimiter) = overrides.delimiter {
            self.delimiter = delimiter;
        }
        if let Some(skip_rows) = overrides.skip_rows {
            self.skip_rows = skip_rows;
        }
        if let Some(columns) = &overrides.columns {
            self.columns = Some(columns.clone());
        }
        if let Some(text_columns) = &overrides.text_columns {
            self.text_columns = text_columns.clone();
        }
        if overrides.max_rows.is_some() {
            self.max_rows = overrides.max_rows;
        }
        self
    }
}

/// Caller overrides; unset fields keep the format defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadOverrides {
    pub delimiter: Option<Delimiter>,
    pub skip_rows: Option<usize>,
    pub columns: Option<Vec<String>>,
    pub text_columns: Option<Vec<String>>,
    pub max_rows: Option<usize>,
}

impl LoadOverrides {
    /// Restrict the read to these columns
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Load these columns as strings regardless of content
    pub fn with_text_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.text_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = Some(skip_rows);
        self
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Stop after this many data rows
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

/// Reader for one file layout
#[derive(Debug, Clone)]
pub struct TabularFileReader {
    header: HeaderSpec,
    defaults: LoadOptions,
}

impl TabularFileReader {
    pub fn new(format: FileFormat) -> Self {
        Self {
            header: HeaderSpec::for_format(format),
            defaults: LoadOptions::defaults_for(format),
        }
    }

    /// Reader with an explicit header layout
    pub fn with_header_spec(mut self, header: HeaderSpec) -> Self {
        self.defaults.skip_rows = header.line + 1;
        self.header = header;
        self
    }

    pub fn header_spec(&self) -> &HeaderSpec {
        &self.header
    }

    /// Read `file_path` into a data frame
    pub fn read(&self, file_path: &Path, overrides: &LoadOverrides) -> Result<DataFrame> {
        let options = self.defaults.clone().merged(overrides);
        let names = parse_column_names(file_path, &self.header)?;

        let selected: Vec<usize> = match &options.columns {
            None => (0..names.len()).collect(),
            Some(wanted) => {
                for column in wanted {
                    if !names.contains(column) {
                        return Err(MatchError::missing_column(column));
                    }
                }
                (0..names.len())
                    .filter(|&i| wanted.contains(&names[i]))
                    .collect()
            }
        };

        let content = std::fs::read_to_string(file_path)?;
        let mut raw: Vec<Vec<&str>> = vec![Vec::new(); selected.len()];
        let mut rows = 0usize;

        for (line_num, line) in content.lines().enumerate().skip(options.skip_rows) {
            if options.max_rows.is_some_and(|max| rows >= max) {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields = split_fields(trimmed, options.delimiter);
            if fields.len() != names.len() {
                return Err(MatchError::format(
                    file_path,
                    line_num + 1,
                    format!("expected {} fields, found {}", names.len(), fields.len()),
                ));
            }

            for (slot, &index) in selected.iter().enumerate() {
                raw[slot].push(fields[index]);
            }
            rows += 1;
        }

        let columns: Vec<Column> = selected
            .iter()
            .zip(raw.iter())
            .map(|(&index, values)| {
                let name = &names[index];
                build_column(name, values, options.text_columns.contains(name))
            })
            .collect();

        debug!(
            "Loaded {} rows x {} columns from {}",
            rows,
            columns.len(),
            file_path.display()
        );

        Ok(DataFrame::new(columns)?)
    }
}

fn split_fields(line: &str, delimiter: Delimiter) -> Vec<&str> {
    match delimiter {
        Delimiter::Whitespace => line.split_whitespace().collect(),
        Delimiter::Char(c) => line.split(c).map(str::trim).collect(),
    }
}

/// Typed column from raw tokens: Int64, else Float64, else String
fn build_column(name: &str, values: &[&str], force_text: bool) -> Column {
    if !force_text {
        let ints: Option<Vec<i64>> = values.iter().map(|v| v.parse().ok()).collect();
        if let Some(ints) = ints {
            return Column::new(name.into(), ints);
        }
        let floats: Option<Vec<f64>> = values.iter().map(|v| v.parse().ok()).collect();
        if let Some(floats) = floats {
            return Column::new(name.into(), floats);
        }
    }
    Column::new(name.into(), values.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{float_values, string_values};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn dyn_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# Dynamical information [code units]").unwrap();
        writeln!(file, "#1.t #2.tcount #3.M #4.rc_spitzer #5.r_h").unwrap();
        writeln!(file, "0 0 1.0 0.10 0.50").unwrap();
        writeln!(file, "1.5 1 0.98 0.09 0.52").unwrap();
        writeln!(file, "3.0 2 0.95 0.08 0.55").unwrap();
        file
    }

    #[test]
    fn test_read_dynamics_file() {
        let file = dyn_file();
        let reader = TabularFileReader::new(FileFormat::Dynamics);
        let frame = reader.read(file.path(), &LoadOverrides::default()).unwrap();

        assert_eq!(frame.height(), 3);
        assert_eq!(
            frame.get_column_names_str(),
            vec!["t", "tcount", "M", "rc_spitzer", "r_h"]
        );
        assert_eq!(frame.column("tcount").unwrap().dtype(), &DataType::Int64);
        assert_eq!(float_values(&frame, "t").unwrap(), vec![0.0, 1.5, 3.0]);
    }

    #[test]
    fn test_selected_columns_keep_header_order() {
        let file = dyn_file();
        let reader = TabularFileReader::new(FileFormat::Dynamics);
        let overrides = LoadOverrides::default().with_columns(["r_h", "t"]);
        let frame = reader.read(file.path(), &overrides).unwrap();

        assert_eq!(frame.get_column_names_str(), vec!["t", "r_h"]);
    }

    #[test]
    fn test_unknown_selected_column() {
        let file = dyn_file();
        let reader = TabularFileReader::new(FileFormat::Dynamics);
        let overrides = LoadOverrides::default().with_columns(["t", "mass"]);

        match reader.read(file.path(), &overrides).unwrap_err() {
            MatchError::MissingColumn { column } => assert_eq!(column, "mass"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_rows_override() {
        let file = dyn_file();
        let reader = TabularFileReader::new(FileFormat::Dynamics);
        let frame = reader
            .read(file.path(), &LoadOverrides::default().with_skip_rows(3))
            .unwrap();

        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn test_max_rows_limits_data_rows() {
        let file = dyn_file();
        let reader = TabularFileReader::new(FileFormat::Dynamics);
        let frame = reader
            .read(file.path(), &LoadOverrides::default().with_max_rows(2))
            .unwrap();

        assert_eq!(float_values(&frame, "t").unwrap(), vec![0.0, 1.5]);
    }

    #[test]
    fn test_plain_table_with_text_key() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Cluster   Mass      rc").unwrap();
        writeln!(file, "NGC_104   8.95e5    0.47").unwrap();
        writeln!(file, "2808      8.64e5    0.70").unwrap();

        let reader = TabularFileReader::new(FileFormat::Plain);
        let overrides = LoadOverrides::default().with_text_columns(["Cluster"]);
        let frame = reader.read(file.path(), &overrides).unwrap();

        assert_eq!(frame.column("Cluster").unwrap().dtype(), &DataType::String);
        assert_eq!(
            string_values(&frame, "Cluster").unwrap(),
            vec!["NGC_104", "2808"]
        );
        assert_eq!(frame.column("Mass").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_ragged_row_is_format_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a b c").unwrap();
        writeln!(file, "1 2 3").unwrap();
        writeln!(file, "4 5").unwrap();

        let reader = TabularFileReader::new(FileFormat::Plain);
        match reader.read(file.path(), &LoadOverrides::default()).unwrap_err() {
            MatchError::Format { line, .. } => assert_eq!(line, 3),
            other => panic!("Expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_char_delimiter() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a b").unwrap();
        writeln!(file, "1, 2").unwrap();

        let reader = TabularFileReader::new(FileFormat::Plain);
        let overrides = LoadOverrides::default().with_delimiter(Delimiter::Char(','));
        let frame = reader.read(file.path(), &overrides).unwrap();
        assert_eq!(float_values(&frame, "b").unwrap(), vec![2.0]);
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let defaults = LoadOptions::defaults_for(FileFormat::Dynamics);
        assert_eq!(defaults.skip_rows, 2);

        let merged = defaults.merged(&LoadOverrides::default().with_columns(["t"]));
        assert_eq!(merged.skip_rows, 2);
        assert_eq!(merged.columns, Some(vec!["t".to_string()]));
        assert_eq!(merged.delimiter, Delimiter::Whitespace);
    }
}
