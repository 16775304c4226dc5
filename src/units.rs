//! Physical unit conversion for tables loaded from CMC output.
//!
//! CMC writes every quantity in code units. Each model directory carries an
//! `initial.conv.sh` script listing the factors that turn code units into
//! physical ones. A [`UnitDictionaryBuilder`] turns that text into a
//! [`UnitDictionary`]; a [`UnitTable`] then scales requested columns by the
//! factor a unit expression such as `msun / pc` resolves to.
//!
//! Each column is converted at most once per table. The flags live on the
//! table value, so asking for the same conversion twice is a no-op.

use crate::constants::UNIT_DEFINITION_FILE;
use crate::error::{MatchError, Result};
use crate::table::{float_values, set_float_column};
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Mapping from unit name to its code-unit conversion factor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitDictionary {
    factors: HashMap<String, f64>,
}

impl UnitDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit: impl Into<String>, factor: f64) {
        self.factors.insert(unit.into(), factor);
    }

    /// Conversion factor for `unit`; unknown units are an error
    pub fn factor(&self, unit: &str) -> Result<f64> {
        self.factors
            .get(unit)
            .copied()
            .ok_or_else(|| MatchError::UnknownUnit {
                unit: unit.to_string(),
            })
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.factors.contains_key(unit)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Evaluate a unit expression such as `msun / pc`
    pub fn evaluate(&self, expression: &str) -> Result<f64> {
        parse_expression(expression)?
            .into_iter()
            .try_fold(1.0, |acc, (op, unit)| {
                let factor = self.factor(unit)?;
                Ok(match op {
                    Operator::Multiply => acc * factor,
                    Operator::Divide => acc / factor,
                })
            })
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for UnitDictionary {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            factors: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Builds a unit dictionary from the text of a unit-definition file
pub trait UnitDictionaryBuilder {
    fn build(&self, text: &str) -> Result<UnitDictionary>;
}

/// Builder for CMC `initial.conv.sh` scripts
///
/// The script is a list of `key=value` assignments. Base units are read
/// straight from their keys; derived units are only defined when their base
/// key is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvScriptUnits;

/// Script key to unit name
const BASE_UNITS: &[(&str, &str)] = &[
    ("massunitmsun", "msun"),
    ("massunitcgs", "g"),
    ("mstarunitmsun", "mstar_msun"),
    ("lengthunitparsec", "pc"),
    ("lengthunitcgs", "cm"),
    ("timeunitsmyr", "myr"),
    ("timeunitcgs", "s"),
    ("nbtimeunitsmyr", "nb_myr"),
    ("nbtimeunitcgs", "nb_s"),
];

/// Derived unit, its base unit, and the multiplier applied to the base factor
const DERIVED_UNITS: &[(&str, &str, f64)] = &[
    ("kg", "g", 1.0e-3),
    ("km", "cm", 1.0e-5),
    ("au", "cm", 1.0 / 1.495_978_707e13),
    ("gyr", "myr", 1.0e-3),
    ("yr", "myr", 1.0e6),
];

impl UnitDictionaryBuilder for ConvScriptUnits {
    fn build(&self, text: &str) -> Result<UnitDictionary> {
        let mut assignments = HashMap::new();
        for (line_num, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value: f64 = value.trim().parse().map_err(|_| {
                MatchError::format(
                    UNIT_DEFINITION_FILE,
                    line_num + 1,
                    format!("value of '{}' is not a number: '{}'", key.trim(), value.trim()),
                )
            })?;
            assignments.insert(key.trim().to_string(), value);
        }

        let mut units = UnitDictionary::new();
        units.insert("code", 1.0);
        for (key, unit) in BASE_UNITS {
            if let Some(&factor) = assignments.get(*key) {
                units.insert(*unit, factor);
            }
        }
        for (unit, base, multiplier) in DERIVED_UNITS {
            if let Ok(factor) = units.factor(base) {
                units.insert(*unit, factor * multiplier);
            }
        }

        debug!("Built unit dictionary with {} units", units.len());
        Ok(units)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Multiply,
    Divide,
}

/// Split an expression into (operator, unit) pairs
///
/// The expression begins with an implicit multiply, so it must start with a
/// unit name and then alternate operator and unit.
fn parse_expression(expression: &str) -> Result<Vec<(Operator, &str)>> {
    let mut terms = Vec::new();
    let mut pending = Some(Operator::Multiply);

    for token in expression.split_whitespace() {
        let operator = match token {
            "*" => Some(Operator::Multiply),
            "/" => Some(Operator::Divide),
            _ => None,
        };
        match (operator, pending.take()) {
            (Some(_), Some(_)) => {
                return Err(MatchError::grammar(
                    expression,
                    format!("operator '{}' must follow a unit name", token),
                ));
            }
            (Some(op), None) => pending = Some(op),
            (None, Some(op)) => terms.push((op, token)),
            (None, None) => {
                return Err(MatchError::grammar(
                    expression,
                    format!("unit '{}' must follow an operator", token),
                ));
            }
        }
    }

    if terms.is_empty() {
        return Err(MatchError::grammar(expression, "expression is empty"));
    }
    if pending.is_some() {
        return Err(MatchError::grammar(
            expression,
            "expression ends with an operator",
        ));
    }
    Ok(terms)
}

/// A data frame plus the conversion state of each of its columns
#[derive(Debug, Clone)]
pub struct UnitTable {
    frame: DataFrame,
    source: Option<PathBuf>,
    converted: BTreeMap<String, bool>,
}

impl UnitTable {
    /// Wrap a freshly loaded table; every column starts unconverted
    pub fn new(frame: DataFrame, source: Option<PathBuf>) -> Self {
        let converted = frame
            .get_column_names_str()
            .into_iter()
            .map(|name| (name.to_string(), false))
            .collect();
        Self {
            frame,
            source,
            converted,
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_converted(&self, column: &str) -> bool {
        self.converted.get(column).copied().unwrap_or(false)
    }

    /// Path of the unit-definition file next to the table's source file
    pub fn unit_definition_path(&self) -> Result<PathBuf> {
        let source = self.source.as_ref().ok_or_else(|| MatchError::Configuration {
            message: "table has no source file to locate unit definitions from".to_string(),
        })?;
        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(UNIT_DEFINITION_FILE))
    }

    /// Load the sibling unit-definition file through `builder`
    pub fn sibling_units(&self, builder: &dyn UnitDictionaryBuilder) -> Result<UnitDictionary> {
        let path = self.unit_definition_path()?;
        let text = std::fs::read_to_string(&path)?;
        builder.build(&text)
    }

    /// Convert columns in place
    ///
    /// `requests` maps column name to unit expression. Without an explicit
    /// dictionary the sibling `initial.conv.sh` is read. Absent columns fail
    /// with `MissingColumn` unless `missing_ok`; converted columns are left
    /// alone. Every factor is resolved before any column is touched.
    pub fn convert(
        &mut self,
        requests: &BTreeMap<String, String>,
        units: Option<&UnitDictionary>,
        missing_ok: bool,
    ) -> Result<()> {
        let loaded;
        let units = match units {
            Some(units) => units,
            None => {
                loaded = self.sibling_units(&ConvScriptUnits)?;
                &loaded
            }
        };

        let mut pending = Vec::new();
        for (column, expression) in requests {
            if !self.converted.contains_key(column) {
                if missing_ok {
                    debug!("Skipping conversion of absent column '{}'", column);
                    continue;
                }
                return Err(MatchError::missing_column(column));
            }
            if self.is_converted(column) {
                continue;
            }
            pending.push((column, units.evaluate(expression)?));
        }

        for (column, factor) in pending {
            let scaled = float_values(&self.frame, column)?
                .into_iter()
                .map(|value| value * factor)
                .collect();
            set_float_column(&mut self.frame, column, scaled)?;
            self.converted.insert(column.clone(), true);
            debug!("Converted column '{}' by factor {}", column, factor);
        }

        Ok(())
    }
}
