//! Column header extraction for CMC output files.
//!
//! CMC writes its column names on a single header line, each token carrying
//! a positional namespace prefix (`#1:t #2:Dt #3:tcount ...`). Some outputs
//! use `.` in place of the colon. This module reads that line and strips the
//! prefixes so the remaining names can label a table.

use crate::error::{MatchError, Result};
use crate::models::FileFormat;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Where and how a file stores its column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    /// Zero-based line index of the header
    pub line: usize,
    /// Characters rewritten to `separator` before splitting, in order
    pub aliases: Vec<char>,
    /// Namespace separator; `None` keeps tokens verbatim
    pub separator: Option<char>,
}

impl HeaderSpec {
    pub fn for_format(format: FileFormat) -> Self {
        Self {
            line: format.header_line(),
            aliases: format.separator_aliases(),
            separator: format.namespace_separator(),
        }
    }
}

/// Read the header line of `file_path` and return its column names
pub fn parse_column_names(file_path: &Path, spec: &HeaderSpec) -> Result<Vec<String>> {
    let file = File::open(file_path)?;
    let reader = BufReader::new(file);

    let mut header = None;
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line_num == spec.line {
            header = Some(line);
            break;
        }
    }

    let header = header.ok_or_else(|| {
        MatchError::format(
            file_path,
            spec.line + 1,
            format!("file ends before header line {}", spec.line),
        )
    })?;

    let names = split_header_line(&header, spec)
        .map_err(|reason| MatchError::format(file_path, spec.line + 1, reason))?;

    debug!(
        "Parsed {} column names from {}: {:?}",
        names.len(),
        file_path.display(),
        names
    );

    Ok(names)
}

/// Split one header line into column names
///
/// Every token must contain the separator once the aliases are applied;
/// the name is the segment following its first occurrence, up to the next
/// separator if one follows.
pub fn split_header_line(
    line: &str,
    spec: &HeaderSpec,
) -> std::result::Result<Vec<String>, String> {
    let Some(separator) = spec.separator else {
        return Ok(line.split_whitespace().map(str::to_string).collect());
    };

    let normalized = spec
        .aliases
        .iter()
        .fold(line.to_string(), |acc, alias| acc.replace(*alias, &separator.to_string()));

    normalized
        .split_whitespace()
        .map(|token| match token.split(separator).nth(1) {
            Some("") => Err(format!("header token '{}' has an empty name", token)),
            Some(name) => Ok(name.to_string()),
            None => Err(format!(
                "header token '{}' has no '{}' separator",
                token, separator
            )),
        })
        .collect()
}
