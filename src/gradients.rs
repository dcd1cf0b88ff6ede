//! Gradient tables: b-values and b-vectors.
//!
//! Both tables are whitespace-delimited text, one entry per acquired
//! volume. B-vectors come in two common on-disk shapes (3 rows × N columns
//! or N rows × 3 columns) plus the degenerate flat form; they are
//! canonicalized to 3×N at load time so the rest of the crate never
//! branches on orientation.

use crate::error::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;

/// Parse whitespace-delimited numeric text into rows.
///
/// Blank lines are skipped. `what` names the table in error messages.
fn parse_rows(text: &str, what: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut row = Vec::with_capacity(rows.first().map_or(4, Vec::len));
        for token in line.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| {
                Error::Format(format!(
                    "{}: non-numeric token '{}' on line {}",
                    what,
                    token,
                    lineno + 1
                ))
            })?;
            row.push(value);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(Error::Format(format!("{}: table is empty", what)));
    }
    Ok(rows)
}

fn read_table(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::NotFound {
        path: path.to_path_buf(),
        source,
    })
}

/// Gradient magnitudes (b-values), one per volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvals(Array1<f64>);

impl Bvals {
    /// Parse from text. Values may be spread over any number of lines.
    pub fn parse(text: &str) -> Result<Self> {
        let rows = parse_rows(text, "bval")?;
        let values: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Self(Array1::from_vec(values)))
    }

    /// Read from a text file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(&read_table(path.as_ref())?)
    }

    /// Number of volumes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying values.
    pub fn values(&self) -> &Array1<f64> {
        &self.0
    }

    /// Select entries in the given order (fancy indexing).
    pub fn reorder(&self, order: &[usize]) -> Self {
        Self(self.0.select(Axis(0), order))
    }

    /// Serialize as text: one value per line, 2 decimal digits.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 8);
        for v in &self.0 {
            let _ = writeln!(out, "{:.2}", v);
        }
        out
    }

    /// Write to a text file, overwriting any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }
}

/// Gradient directions (b-vectors) in canonical 3×N orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvecs(Array2<f64>);

impl Bvecs {
    /// Parse from text and canonicalize to 3×N.
    ///
    /// Accepted shapes: 3×N (as-is), N×3 (transposed), or a flat sequence
    /// reshaped into 3 rows. A 3×3 table is ambiguous; it is taken as
    /// already being in 3-row form, with a warning, so that re-running on
    /// a previously written table stays a no-op.
    pub fn parse(text: &str) -> Result<Self> {
        let rows = parse_rows(text, "bvec")?;

        let ncols = rows[0].len();
        if rows.iter().any(|r| r.len() != ncols) {
            return Err(Error::Format(
                "bvec: rows have inconsistent lengths".to_string(),
            ));
        }
        let nrows = rows.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();

        // One row or one column reads as a flat sequence
        if nrows == 1 || ncols == 1 {
            return Self::from_flat(flat);
        }

        let table = Array2::from_shape_vec((nrows, ncols), flat)
            .map_err(|e| Error::ShapeMismatch(format!("bvec: {}", e)))?;

        if nrows == 3 && ncols == 3 {
            warn!("bvec table is 3x3; assuming it is already in 3-row orientation");
            return Ok(Self(table));
        }
        if nrows == 3 {
            return Ok(Self(table));
        }
        if ncols == 3 {
            return Ok(Self(table.reversed_axes().as_standard_layout().to_owned()));
        }
        Err(Error::ShapeMismatch(format!(
            "bvec: expected 3xN or Nx3 table, got {}x{}",
            nrows, ncols
        )))
    }

    fn from_flat(flat: Vec<f64>) -> Result<Self> {
        if flat.len() % 3 != 0 {
            return Err(Error::ShapeMismatch(format!(
                "bvec: flat sequence of {} values does not reshape into 3 rows",
                flat.len()
            )));
        }
        let n = flat.len() / 3;
        let table = Array2::from_shape_vec((3, n), flat)
            .map_err(|e| Error::ShapeMismatch(format!("bvec: {}", e)))?;
        Ok(Self(table))
    }

    /// Read from a text file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(&read_table(path.as_ref())?)
    }

    /// Number of volumes (columns).
    pub fn num_volumes(&self) -> usize {
        self.0.ncols()
    }

    /// The canonical 3×N table.
    pub fn values(&self) -> &Array2<f64> {
        &self.0
    }

    /// Direction vector for volume `i`.
    pub fn direction(&self, i: usize) -> [f64; 3] {
        [self.0[[0, i]], self.0[[1, i]], self.0[[2, i]]]
    }

    /// Select columns in the given order (fancy indexing).
    pub fn reorder(&self, order: &[usize]) -> Self {
        Self(self.0.select(Axis(1), order))
    }

    /// Serialize as text: 3 lines of N space-separated values, 6 decimal
    /// digits.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 12);
        for row in self.0.rows() {
            let mut first = true;
            for v in row {
                if !first {
                    out.push(' ');
                }
                let _ = write!(out, "{:.6}", v);
                first = false;
            }
            out.push('\n');
        }
        out
    }

    /// Write to a text file, overwriting any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }
}
