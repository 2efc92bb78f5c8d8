//! Matrix Market coordinate reader
//!
//! Just enough of the format to load benchmark inputs: coordinate matrices
//! with `real`, `integer` or `pattern` fields and `general`, `symmetric` or
//! `skew-symmetric` storage. Everything else is rejected with
//! [`Error::MatrixMarket`].

use crate::csr::CsrMatrix;
use crate::error::{Error, Result};
use crate::numeric::{to_index, Element};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

const BANNER: &str = "%%matrixmarket";

/// Upper bound on entries reserved up front; the declared count is untrusted
const RESERVE_LIMIT: usize = 1 << 20;

/// Value field declared in the banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Real,
    Integer,
    Pattern,
}

/// Storage symmetry declared in the banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    General,
    Symmetric,
    SkewSymmetric,
}

/// Parsed banner and size line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub field: Field,
    pub symmetry: Symmetry,
    pub rows: usize,
    pub cols: usize,
    /// Number of entry lines in the file (before symmetric expansion)
    pub entries: usize,
}

/// Load a CSR matrix from a Matrix Market file
///
/// A missing or unreadable file surfaces as [`Error::Io`]; a malformed banner,
/// size line or entry as [`Error::MatrixMarket`].
pub fn read_csr<T: Element>(path: impl AsRef<Path>) -> Result<CsrMatrix<T>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let matrix = parse_csr_from(BufReader::new(file), path)?;
    debug!(
        path = %path.display(),
        rows = matrix.n_rows(),
        cols = matrix.n_cols(),
        nnz = matrix.nnz(),
        "loaded matrix market file"
    );
    Ok(matrix)
}

/// Parse a CSR matrix from any buffered reader
pub fn parse_csr<T: Element, R: BufRead>(reader: R) -> Result<CsrMatrix<T>> {
    parse_csr_from(reader, Path::new("<stream>"))
}

fn parse_csr_from<T: Element, R: BufRead>(reader: R, origin: &Path) -> Result<CsrMatrix<T>> {
    let mut lines = reader.lines().enumerate();

    let (banner_no, banner) = match lines.next() {
        Some((no, line)) => (no + 1, line?),
        None => return Err(Error::matrix_market(origin, 0, "empty file")),
    };
    let (field, symmetry) = parse_banner(&banner).map_err(|reason| Error::matrix_market(origin, banner_no, reason))?;

    // Skip comments and blank lines up to the size line
    let (size_no, size_line) = loop {
        match lines.next() {
            Some((no, line)) => {
                let line = line?;
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('%') {
                    continue;
                }
                break (no + 1, line);
            }
            None => return Err(Error::matrix_market(origin, banner_no, "missing size line")),
        }
    };
    let (rows, cols, entries) =
        parse_size(&size_line).map_err(|reason| Error::matrix_market(origin, size_no, reason))?;
    if symmetry != Symmetry::General && rows != cols {
        return Err(Error::matrix_market(
            origin,
            size_no,
            format!("{symmetry:?} matrix must be square, got {rows}x{cols}"),
        ));
    }

    let header = Header {
        field,
        symmetry,
        rows,
        cols,
        entries,
    };

    let reserve = match symmetry {
        Symmetry::General => entries,
        _ => entries.saturating_mul(2),
    };
    let mut triplets = Vec::with_capacity(reserve.min(RESERVE_LIMIT));
    let mut seen = 0usize;
    for (no, line) in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        if seen == entries {
            return Err(Error::matrix_market(
                origin,
                no + 1,
                format!("more than the declared {entries} entries"),
            ));
        }
        let (r, c, v) = parse_entry::<T>(trimmed, &header)
            .map_err(|reason| Error::matrix_market(origin, no + 1, reason))?;
        triplets.push((r, c, v));
        if r != c {
            match symmetry {
                Symmetry::General => {}
                Symmetry::Symmetric => triplets.push((c, r, v)),
                Symmetry::SkewSymmetric => triplets.push((c, r, -v)),
            }
        }
        seen += 1;
    }
    if seen != entries {
        return Err(Error::matrix_market(
            origin,
            size_no,
            format!("declared {entries} entries, found {seen}"),
        ));
    }

    CsrMatrix::from_triplets(rows, cols, &triplets)
}

fn parse_banner(line: &str) -> std::result::Result<(Field, Symmetry), String> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_ascii_lowercase).collect();
    if tokens.first().map(String::as_str) != Some(BANNER) {
        return Err("missing %%MatrixMarket banner".to_string());
    }
    if tokens.len() != 5 {
        return Err(format!("banner has {} tokens, expected 5", tokens.len()));
    }
    if tokens[1] != "matrix" {
        return Err(format!("unsupported object '{}'", tokens[1]));
    }
    if tokens[2] != "coordinate" {
        return Err(format!("unsupported format '{}'", tokens[2]));
    }
    let field = match tokens[3].as_str() {
        "real" | "double" => Field::Real,
        "integer" => Field::Integer,
        "pattern" => Field::Pattern,
        other => return Err(format!("unsupported field '{other}'")),
    };
    let symmetry = match tokens[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        "skew-symmetric" => Symmetry::SkewSymmetric,
        other => return Err(format!("unsupported symmetry '{other}'")),
    };
    Ok((field, symmetry))
}

fn parse_size(line: &str) -> std::result::Result<(usize, usize, usize), String> {
    let parsed: std::result::Result<Vec<usize>, _> =
        line.split_whitespace().map(str::parse::<usize>).collect();
    match parsed.as_deref() {
        Ok([rows, cols, entries]) => {
            for (name, value) in [("rows", *rows), ("columns", *cols), ("entries", *entries)] {
                if to_index(value).is_none() {
                    return Err(format!("{name} {value} exceeds the 32-bit index range"));
                }
            }
            Ok((*rows, *cols, *entries))
        }
        Ok(other) => Err(format!("size line has {} values, expected 3", other.len())),
        Err(e) => Err(format!("invalid size line: {e}")),
    }
}

fn parse_entry<T: Element>(line: &str, header: &Header) -> std::result::Result<(usize, usize, T), String> {
    let mut tokens = line.split_whitespace();
    let mut coordinate = |name: &str, bound: usize| -> std::result::Result<usize, String> {
        let raw = tokens.next().ok_or_else(|| format!("missing {name} index"))?;
        let one_based: usize = raw.parse().map_err(|e| format!("invalid {name} index '{raw}': {e}"))?;
        if one_based == 0 || one_based > bound {
            return Err(format!("{name} index {one_based} out of range 1..={bound}"));
        }
        Ok(one_based - 1)
    };
    let row = coordinate("row", header.rows)?;
    let col = coordinate("column", header.cols)?;

    let value = match header.field {
        Field::Pattern => T::one(),
        Field::Real | Field::Integer => {
            let raw = tokens.next().ok_or_else(|| "missing value".to_string())?;
            let v: f64 = raw.parse().map_err(|e| format!("invalid value '{raw}': {e}"))?;
            T::from_f64(v)
        }
    };
    if tokens.next().is_some() {
        return Err("trailing tokens after entry".to_string());
    }
    Ok((row, col, value))
}

/// Write a matrix as a general real coordinate file
pub fn write_csr<T: Element>(path: impl AsRef<Path>, matrix: &CsrMatrix<T>) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    writeln!(out, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(out, "{} {} {}", matrix.n_rows(), matrix.n_cols(), matrix.nnz())?;
    for (r, c, v) in matrix.iter() {
        writeln!(out, "{} {} {}", r + 1, c + 1, v)?;
    }
    out.flush()?;
    Ok(())
}
