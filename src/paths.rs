//! Path templates such as `out/fhv-{year:04d}-{month:02d}-predictions.parquet`.
//!
//! Placeholders are `{year}` and `{month}`, optionally followed by an integer
//! format spec (`d`, `4d`, `04d`).

use crate::error::{PipelineError, Result};
use crate::types::Period;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").expect("valid placeholder regex"));
static INT_SPEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0?)(\d*)d?$").expect("valid format spec regex"));

pub fn render(pattern: &str, period: Period) -> Result<String> {
    let mut failure: Option<PipelineError> = None;
    let rendered = PLACEHOLDER.replace_all(pattern, |caps: &Captures| {
        let value = match &caps[1] {
            "year" => i64::from(period.year),
            "month" => i64::from(period.month),
            other => {
                failure.get_or_insert_with(|| {
                    PipelineError::Config(format!("unknown placeholder '{{{}}}' in '{}'", other, pattern))
                });
                return String::new();
            }
        };
        let spec = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        match format_int(value, spec) {
            Some(s) => s,
            None => {
                failure.get_or_insert_with(|| {
                    PipelineError::Config(format!("unsupported format spec '{}' in '{}'", spec, pattern))
                });
                String::new()
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

fn format_int(value: i64, spec: &str) -> Option<String> {
    let caps = INT_SPEC.captures(spec)?;
    let zero_pad = !caps[1].is_empty();
    let width: usize = match &caps[2] {
        "" => 0,
        w => w.parse().ok()?,
    };
    Some(if zero_pad {
        format!("{:0width$}", value, width = width)
    } else {
        format!("{:>width$}", value, width = width)
    })
}
