use std::fmt::Debug;

use crate::dtype::DType;
use crate::error::{Result, TensorError};

/// Storage order of a dense matrix buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    RowMajor,
    ColMajor,
}

/// Whether an operand is used as stored or transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    None,
    Trans,
}

/// Shape and layout of a GEMM call: `C = alpha * op(A) @ op(B) + beta * C`,
/// where op(A) is `m x k`, op(B) is `k x n` and C is `m x n`.
///
/// Leading dimensions follow the BLAS convention: the distance in elements
/// between consecutive rows (row-major) or columns (column-major) of the
/// buffer as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmArgs {
    pub layout: Layout,
    pub trans_a: Transpose,
    pub trans_b: Transpose,
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub lda: usize,
    pub ldb: usize,
    pub ldc: usize,
}

impl GemmArgs {
    /// Dense, non-transposed row-major operands: `lda = k`, `ldb = n`,
    /// `ldc = n`.
    pub fn row_major(m: usize, n: usize, k: usize) -> Self {
        GemmArgs {
            layout: Layout::RowMajor,
            trans_a: Transpose::None,
            trans_b: Transpose::None,
            m,
            n,
            k,
            lda: k,
            ldb: n,
            ldc: n,
        }
    }

    /// Dense, non-transposed column-major operands: `lda = m`, `ldb = k`,
    /// `ldc = m`.
    pub fn col_major(m: usize, n: usize, k: usize) -> Self {
        GemmArgs {
            layout: Layout::ColMajor,
            trans_a: Transpose::None,
            trans_b: Transpose::None,
            m,
            n,
            k,
            lda: m,
            ldb: k,
            ldc: m,
        }
    }

    /// Checks leading dimensions and buffer lengths against the call shape.
    pub fn validate(&self, a_len: usize, b_len: usize, c_len: usize) -> Result<()> {
        let (a_rows, a_cols) = stored_dims(self.trans_a, self.m, self.k);
        let (b_rows, b_cols) = stored_dims(self.trans_b, self.k, self.n);
        check_operand("gemm", "a", self.layout, a_rows, a_cols, self.lda, a_len)?;
        check_operand("gemm", "b", self.layout, b_rows, b_cols, self.ldb, b_len)?;
        check_operand("gemm", "c", self.layout, self.m, self.n, self.ldc, c_len)
    }
}

/// Shape and layout of an LU solve `A @ X = B`, where A is `n x n` and B
/// holds `nrhs` right-hand sides as an `n x nrhs` matrix.
///
/// On return A holds its `P*L*U` factors and B holds X, as with LAPACK
/// `gesv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveArgs {
    pub layout: Layout,
    pub n: usize,
    pub nrhs: usize,
    pub lda: usize,
    pub ldb: usize,
}

impl SolveArgs {
    /// Dense row-major operands: `lda = n`, `ldb = nrhs` (at least 1).
    pub fn row_major(n: usize, nrhs: usize) -> Self {
        SolveArgs {
            layout: Layout::RowMajor,
            n,
            nrhs,
            lda: n.max(1),
            ldb: nrhs.max(1),
        }
    }

    /// Dense column-major operands: `lda = ldb = n` (at least 1).
    pub fn col_major(n: usize, nrhs: usize) -> Self {
        SolveArgs {
            layout: Layout::ColMajor,
            n,
            nrhs,
            lda: n.max(1),
            ldb: n.max(1),
        }
    }

    pub fn validate(&self, a_len: usize, b_len: usize) -> Result<()> {
        check_operand("gesv", "a", self.layout, self.n, self.n, self.lda, a_len)?;
        check_operand("gesv", "b", self.layout, self.n, self.nrhs, self.ldb, b_len)
    }
}

fn stored_dims(trans: Transpose, rows: usize, cols: usize) -> (usize, usize) {
    match trans {
        Transpose::None => (rows, cols),
        Transpose::Trans => (cols, rows),
    }
}

fn check_operand(
    op: &str,
    name: &str,
    layout: Layout,
    rows: usize,
    cols: usize,
    ld: usize,
    len: usize,
) -> Result<()> {
    let (outer, inner) = match layout {
        Layout::RowMajor => (rows, cols),
        Layout::ColMajor => (cols, rows),
    };
    if ld < inner.max(1) {
        return Err(TensorError::Backend(format!(
            "{}: ld{}={} is smaller than {}",
            op,
            name,
            ld,
            inner.max(1)
        )));
    }
    let required = if outer == 0 || inner == 0 {
        0
    } else {
        (outer - 1) * ld + inner
    };
    if len < required {
        return Err(TensorError::Backend(format!(
            "{}: {}.len()={} but at least {} elements are required",
            op, name, len, required
        )));
    }
    Ok(())
}

/// Trait for pluggable compute backends (CPU, CUDA, etc.).
///
/// A backend exposes a dense matrix-multiply primitive with the BLAS
/// calling convention, and optionally an LU solver with the LAPACK one.
/// Buffers are passed as dense slices; the backend never sees strides beyond
/// the leading dimension.
pub trait ComputeBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Whether `gemm` and `gesv` can run on operands of this dtype.
    fn supports_dtype(&self, dtype: DType) -> bool {
        dtype == DType::Float32
    }

    /// Single-precision GEMM.
    fn gemm_f32(
        &self,
        args: &GemmArgs,
        alpha: f32,
        a: &[f32],
        b: &[f32],
        beta: f32,
        c: &mut [f32],
    ) -> Result<()>;

    /// Double-precision GEMM.
    fn gemm_f64(
        &self,
        _args: &GemmArgs,
        _alpha: f64,
        _a: &[f64],
        _b: &[f64],
        _beta: f64,
        _c: &mut [f64],
    ) -> Result<()> {
        Err(TensorError::UnsupportedDType(format!(
            "{} backend has no Float64 gemm",
            self.name()
        )))
    }

    /// Single-precision `A @ X = B` by LU with partial pivoting. Fails with
    /// `Singular(i)` when `U(i,i)` (1-based) is exactly zero.
    fn gesv_f32(&self, _args: &SolveArgs, _a: &mut [f32], _b: &mut [f32]) -> Result<()> {
        Err(TensorError::Backend(format!(
            "{} backend has no solver",
            self.name()
        )))
    }

    /// Double-precision counterpart of [`ComputeBackend::gesv_f32`].
    fn gesv_f64(&self, _args: &SolveArgs, _a: &mut [f64], _b: &mut [f64]) -> Result<()> {
        Err(TensorError::Backend(format!(
            "{} backend has no solver",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_leading_dims() {
        let args = GemmArgs::row_major(2, 5, 3);
        assert_eq!((args.lda, args.ldb, args.ldc), (3, 5, 5));
        assert!(args.validate(6, 15, 10).is_ok());
    }

    #[test]
    fn test_col_major_leading_dims() {
        let args = GemmArgs::col_major(2, 5, 3);
        assert_eq!((args.lda, args.ldb, args.ldc), (2, 3, 2));
        assert!(args.validate(6, 15, 10).is_ok());
    }

    #[test]
    fn test_validate_short_buffer() {
        let args = GemmArgs::row_major(2, 2, 2);
        assert!(args.validate(3, 4, 4).is_err());
        assert!(args.validate(4, 4, 3).is_err());
    }

    #[test]
    fn test_validate_small_leading_dim() {
        let mut args = GemmArgs::row_major(2, 2, 3);
        args.lda = 2;
        assert!(args.validate(100, 100, 100).is_err());
    }

    #[test]
    fn test_solve_args() {
        let args = SolveArgs::row_major(3, 2);
        assert_eq!((args.lda, args.ldb), (3, 2));
        assert!(args.validate(9, 6).is_ok());
        assert!(args.validate(8, 6).is_err());
        let err = args.validate(9, 5).unwrap_err();
        assert!(err.to_string().starts_with("backend error: gesv: b.len()=5"));

        let args = SolveArgs::col_major(3, 2);
        assert_eq!((args.lda, args.ldb), (3, 3));
        assert!(args.validate(9, 6).is_ok());
    }

    #[test]
    fn test_solve_args_without_rhs() {
        let args = SolveArgs::row_major(2, 0);
        assert_eq!(args.ldb, 1);
        assert!(args.validate(4, 0).is_ok());
    }

    #[test]
    fn test_validate_transposed() {
        // op(A) = A^T is 2x3, so A is stored as 3x2 with lda = 2.
        let mut args = GemmArgs::row_major(2, 4, 3);
        args.trans_a = Transpose::Trans;
        args.lda = 2;
        assert!(args.validate(6, 12, 8).is_ok());
    }
}
