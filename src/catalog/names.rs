//! Model parameter parsing from catalog entry names.
//!
//! Kremer+20 models are named `N<count>_rv<rv>_rg<rg>_Z<z>`, sometimes with
//! a `_v2` suffix. Counts are written in scientific notation (`N1e5`,
//! `N3.2e5`), so every field is read as a float first.

use crate::constants::MODEL_VERSION_SUFFIX;
use crate::error::{MatchError, Result};
use crate::models::{ModelParams, NamingConvention};
use regex::Regex;
use std::sync::LazyLock;

static KREMER20_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^N(?P<n>[^_]+)_rv(?P<rv>[^_]+)_rg(?P<rg>[^_]+)_Z(?P<z>[^_]+)$")
        .expect("Kremer+20 name pattern is valid")
});

/// Apply literal (from, to) substitutions in order
pub fn apply_replacements(name: &str, replacements: &[(String, String)]) -> String {
    replacements
        .iter()
        .fold(name.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
}

/// Parse a model name under `convention`
pub fn parse_model_name(name: &str, convention: &NamingConvention) -> Result<ModelParams> {
    match convention {
        NamingConvention::Kremer20 => parse_kremer20(name),
        NamingConvention::Other(other) => Err(MatchError::UnsupportedConvention {
            convention: other.clone(),
        }),
    }
}

fn parse_kremer20(name: &str) -> Result<ModelParams> {
    let stripped = name.replace(MODEL_VERSION_SUFFIX, "");
    let invalid = |reason: String| MatchError::InvalidModelName {
        name: name.to_string(),
        reason,
    };

    let captures = KREMER20_NAME
        .captures(&stripped)
        .ok_or_else(|| invalid("expected N<count>_rv<rv>_rg<rg>_Z<z>".to_string()))?;

    let field = |key: &str| -> Result<f64> {
        let raw = &captures[key];
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| invalid(format!("'{}' is not a number", raw)))
    };

    let n = field("n")?;
    if n < 0.0 || n.fract().abs() > 1e-9 * n.max(1.0) {
        return Err(invalid(format!("particle count {} is not a whole number", n)));
    }

    Ok(ModelParams {
        n: n.round() as i64,
        rv: field("rv")?,
        rg: field("rg")?,
        z: field("z")?,
    })
}
