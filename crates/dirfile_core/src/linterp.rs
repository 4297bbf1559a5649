//! LINTERP lookup tables.

use crate::error::{CoreError, CoreResult};
use std::fs;
use std::path::Path;

/// A piecewise-linear lookup table, sorted by `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinterpTable {
    points: Vec<(f64, f64)>,
}

impl LinterpTable {
    /// Builds a table from `(x, y)` points.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntry` (attributed to `code`) if fewer than two points
    /// are given.
    pub fn new(code: &str, mut points: Vec<(f64, f64)>) -> CoreResult<Self> {
        if points.len() < 2 {
            return Err(CoreError::invalid_entry(
                code,
                format!("lookup table needs at least two points, got {}", points.len()),
            ));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { points })
    }

    /// Loads a table file: two whitespace-separated numbers per line; blank
    /// lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or `InvalidEntry`
    /// for an unparseable line or a table with fewer than two points.
    pub fn load(code: &str, path: &Path) -> CoreResult<Self> {
        let text = fs::read_to_string(path)?;
        let mut points = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut cols = line.split_whitespace().map(str::parse::<f64>);
            match (cols.next(), cols.next()) {
                (Some(Ok(x)), Some(Ok(y))) => points.push((x, y)),
                _ => {
                    return Err(CoreError::invalid_entry(
                        code,
                        format!("{}:{}: malformed table line", path.display(), lineno + 1),
                    ))
                }
            }
        }
        Self::new(code, points)
    }

    /// Number of points in the table, at least two.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Maps `x` through the table, extrapolating linearly beyond its ends.
    #[must_use]
    pub fn interpolate(&self, x: f64) -> f64 {
        interpolate(&self.points, x)
    }

    /// The same table with its columns swapped, for the inverse mapping.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let mut points: Vec<_> = self.points.iter().map(|&(x, y)| (y, x)).collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }
}

fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let upper = points
        .partition_point(|p| p.0 < x)
        .clamp(1, points.len() - 1);
    let (x0, y0) = points[upper - 1];
    let (x1, y1) = points[upper];
    if x1 == x0 {
        return y0;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}
