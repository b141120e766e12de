//! Comma-separated datasets and labelled results

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::linalg::Matrix;

/// Name of the header column that ends the coordinate columns
pub const LABEL_COLUMN: &str = "label";

/// Parse a dataset from CSV text.
///
/// The header names the coordinate columns; counting stops at a column named
/// `label` (which, like any column after it, is ignored in the data rows).
/// Every data row needs at least D numeric fields. Blank lines are skipped.
pub fn parse_csv<R: BufRead>(reader: R) -> Result<Matrix> {
    let mut lines = reader.lines().enumerate();

    let dim = loop {
        match lines.next() {
            Some((idx, line)) => {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let dim = line
                    .split(',')
                    .map(str::trim)
                    .take_while(|name| *name != LABEL_COLUMN)
                    .count();
                if dim == 0 {
                    return Err(Error::malformed(idx + 1, "header has no coordinate columns"));
                }
                break dim;
            }
            None => return Err(Error::malformed(1, "missing header row")),
        }
    };

    let mut values = Vec::new();
    let mut rows = 0;
    for (idx, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        for col in 0..dim {
            let field = fields.next().map(str::trim).ok_or_else(|| {
                Error::malformed(idx + 1, format!("expected {dim} coordinates, found {col}"))
            })?;
            let value: f64 = field.parse().map_err(|_| {
                Error::malformed(idx + 1, format!("column {}: '{field}' is not a number", col + 1))
            })?;
            values.push(value);
        }
        rows += 1;
    }

    Matrix::from_vec(rows, dim, values)
}

/// Load a dataset from a CSV file
pub fn load_csv(path: impl AsRef<Path>) -> Result<Matrix> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let data = parse_csv(BufReader::new(file))?;
    tracing::debug!(path = %path.display(), rows = data.rows(), cols = data.cols(), "loaded dataset");
    Ok(data)
}

/// Write points with their labels.
///
/// Header `x1,...,xD,label`; coordinates with six decimals; labels are
/// written 1-based.
pub fn write_results<W: Write>(mut writer: W, data: &Matrix, labels: &[usize]) -> Result<()> {
    if labels.len() != data.rows() {
        return Err(Error::shape_mismatch(&[data.rows()], &[labels.len()]));
    }
    for d in 0..data.cols() {
        write!(writer, "x{},", d + 1)?;
    }
    writeln!(writer, "{LABEL_COLUMN}")?;

    for (row, &label) in data.iter_rows().zip(labels) {
        for v in row {
            write!(writer, "{v:.6},")?;
        }
        writeln!(writer, "{}", label + 1)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write labelled results to `path`, creating parent directories as needed
pub fn write_results_csv(path: impl AsRef<Path>, data: &Matrix, labels: &[usize]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_results(BufWriter::new(File::create(path)?), data, labels)?;
    tracing::debug!(path = %path.display(), rows = data.rows(), "wrote results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stops_at_label_column() {
        let text = "x1,x2,label\n1.0,2.0,1\n3.5,-4.0,2\n\n";
        let m = parse_csv(text.as_bytes()).unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.5, -4.0]);
    }

    #[test]
    fn test_parse_without_label_column() {
        let m = parse_csv("a,b,c\r\n1,2,3\r\n".as_bytes()).unwrap();
        assert_eq!(m.shape(), (1, 3));
    }

    #[test]
    fn test_parse_reports_line_numbers() {
        let err = parse_csv("x1,x2\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { line: 3, .. }), "{err}");

        let err = parse_csv("x1,x2\n1,abc\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { line: 2, .. }), "{err}");

        let err = parse_csv("label\n1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { line: 1, .. }));

        assert!(parse_csv("".as_bytes()).is_err());
    }

    #[test]
    fn test_write_results_format() {
        let data = Matrix::from_rows(&[[1.0, 2.5], [-0.125, 3.0]]).unwrap();
        let mut out = Vec::new();
        write_results(&mut out, &data, &[0, 2]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "x1,x2,label\n1.000000,2.500000,1\n-0.125000,3.000000,3\n"
        );
    }

    #[test]
    fn test_write_results_rejects_label_count() {
        let data = Matrix::zeros(2, 1);
        assert!(write_results(Vec::new(), &data, &[0]).is_err());
    }
}
