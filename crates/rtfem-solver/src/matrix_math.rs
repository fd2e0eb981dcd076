//! Generic dense-matrix utilities: determinant, contraction, transpose.
//!
//! The element solver inverts its 3×3 Jacobian analytically through these
//! cofactor routines instead of a general LU decomposition, which is both
//! cheaper and numerically exact at this fixed small size. All functions
//! are pure and side-effect free.

use nalgebra::DMatrix;

use crate::error::{FemError, Result};

/// Determinant of a 2×2 matrix, closed form.
fn determinant2(matrix: &DMatrix<f64>) -> f64 {
    matrix[(0, 0)] * matrix[(1, 1)] - matrix[(0, 1)] * matrix[(1, 0)]
}

/// Determinant of a square matrix by recursive cofactor expansion along
/// row 0, with a 2×2 closed-form base case.
///
/// # Errors
/// Returns a dimension error if the matrix is not square or smaller
/// than 2×2.
pub fn determinant(matrix: &DMatrix<f64>) -> Result<f64> {
    let (rows, cols) = matrix.shape();
    if rows != cols {
        return Err(FemError::Dimension(format!(
            "determinant requires a square matrix, got {rows}x{cols}"
        )));
    }

    if rows == 2 {
        return Ok(determinant2(matrix));
    }

    let mut det = 0.0;
    let mut sign = 1.0;
    for i in 0..cols {
        let minor = contract(matrix, 0, i)?;
        det += sign * matrix[(0, i)] * determinant(&minor)?;
        sign = -sign;
    }

    Ok(det)
}

/// The (n−1)×(m−1) matrix obtained by deleting one row and one column,
/// preserving the relative order of the remaining entries.
///
/// # Errors
/// Returns an out-of-range error if `row`/`col` exceed the matrix bounds,
/// and a dimension error if the matrix is too small to contract.
pub fn contract(matrix: &DMatrix<f64>, row: usize, col: usize) -> Result<DMatrix<f64>> {
    let (rows, cols) = matrix.shape();
    if row >= rows || col >= cols {
        return Err(FemError::OutOfRange(format!(
            "contract index ({row}, {col}) out of bounds for {rows}x{cols} matrix"
        )));
    }
    if rows == 1 || cols == 1 {
        return Err(FemError::Dimension(format!(
            "cannot contract a {rows}x{cols} matrix"
        )));
    }

    let mut contracted = DMatrix::zeros(rows - 1, cols - 1);
    for i in 0..rows {
        if i == row {
            continue;
        }
        for j in 0..cols {
            if j == col {
                continue;
            }
            let ci = if i > row { i - 1 } else { i };
            let cj = if j > col { j - 1 } else { j };
            contracted[(ci, cj)] = matrix[(i, j)];
        }
    }

    Ok(contracted)
}

/// Transpose of an m×n matrix.
pub fn transpose(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let (rows, cols) = matrix.shape();
    let mut transposed = DMatrix::zeros(cols, rows);
    for i in 0..rows {
        for j in 0..cols {
            transposed[(j, i)] = matrix[(i, j)];
        }
    }
    transposed
}
