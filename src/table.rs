//! Column access helpers over polars data frames.
//!
//! Catalog code mostly needs plain `f64` and string vectors out of a
//! `DataFrame`, and row subsets taken by position. These helpers keep the
//! polars casting boilerplate in one place.

use crate::error::{MatchError, Result};
use polars::prelude::*;

/// Fail with `MissingColumn` unless `frame` has every column in `names`
pub fn require_columns<S: AsRef<str>>(frame: &DataFrame, names: &[S]) -> Result<()> {
    for name in names {
        let name = name.as_ref();
        if frame.column(name).is_err() {
            return Err(MatchError::missing_column(name));
        }
    }
    Ok(())
}

/// Values of a numeric column as `f64`; nulls become NaN
pub fn float_values(frame: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = frame
        .column(name)
        .map_err(|_| MatchError::missing_column(name))?;
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN))
        .collect())
}

/// Values of a column rendered as strings; nulls become empty strings
pub fn string_values(frame: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = frame
        .column(name)
        .map_err(|_| MatchError::missing_column(name))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect())
}

/// Rows of `frame` at `indices`, in the given order (repeats allowed)
pub fn take_rows(frame: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(frame.take(&idx)?)
}

/// Rows of `frame` where `mask` is true
pub fn filter_rows(frame: &DataFrame, mask: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), mask);
    Ok(frame.filter(&mask)?)
}

/// Replace (or append) a `Float64` column
pub fn set_float_column(frame: &mut DataFrame, name: &str, values: Vec<f64>) -> Result<()> {
    frame.with_column(Column::new(name.into(), values))?;
    Ok(())
}
