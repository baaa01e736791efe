//! Text rendering of scalars, vectors and matrices.
//!
//! Scalars follow the `%g` conversion with six significant digits, the default
//! of a C++ output stream. Vectors and matrices are laid out like Eigen's default
//! stream format: one row per line, every coefficient right-aligned to the width
//! of the widest one, and a single space between columns.

use nalgebra::{DMatrix, DVector};

/// Significant digits used by [`format_general`].
pub const DEFAULT_PRECISION: usize = 6;

/// Format `value` like `%g` with six significant digits.
///
/// ```
/// use chain_ik::io::format_general;
///
/// assert_eq!(format_general(5.0), "5");
/// assert_eq!(format_general(1.0 / 3.0), "0.333333");
/// assert_eq!(format_general(1e-6), "1e-06");
/// assert_eq!(format_general(-0.0), "-0");
/// ```
pub fn format_general(value: f64) -> String {
    format_general_with_precision(value, DEFAULT_PRECISION)
}

/// Format `value` like `%.{precision}g`.
pub fn format_general_with_precision(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.max(1);
    // The exponent after rounding to `precision` significant digits decides the style.
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Format a matrix one row per line, without a trailing newline.
///
/// ```
/// use chain_ik::io::format_matrix;
/// use nalgebra::DMatrix;
///
/// let h = DMatrix::from_row_slice(2, 2, &[14.0, 4.0, 4.0, 2.0]);
/// assert_eq!(format_matrix(&h), "14  4\n 4  2");
/// ```
pub fn format_matrix(matrix: &DMatrix<f64>) -> String {
    let cells: Vec<String> = matrix.iter().map(|&v| format_general(v)).collect();
    let width = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);

    // nalgebra stores column-major
    let rows = matrix.nrows();
    (0..rows)
        .map(|i| {
            (0..matrix.ncols())
                .map(|j| format!("{:>width$}", cells[j * rows + i], width = width))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a column vector one coefficient per line, without a trailing newline.
pub fn format_vector(vector: &DVector<f64>) -> String {
    let cells: Vec<String> = vector.iter().map(|&v| format_general(v)).collect();
    let width = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);
    cells
        .iter()
        .map(|c| format!("{:>width$}", c, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}
