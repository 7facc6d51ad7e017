// Reference LU solver.
//
// Doolittle elimination with partial pivoting, row swaps applied across the
// whole row as LAPACK `getrf` does, so the factors left in A match `gesv`.

use crate::backend::SolveArgs;
use crate::cpu::gemm::{index, Scalar};
use crate::error::{Result, TensorError};

/// Solves `A @ X = B` in place: A is replaced by its LU factors (unit L
/// below the diagonal) and B by X.
pub(crate) fn gesv<T: Scalar>(args: &SolveArgs, a: &mut [T], b: &mut [T]) -> Result<()> {
    args.validate(a.len(), b.len())?;
    let (n, nrhs, layout) = (args.n, args.nrhs, args.layout);
    let ia = |r: usize, c: usize| index(layout, args.lda, r, c);
    let ib = |r: usize, c: usize| index(layout, args.ldb, r, c);

    for col in 0..n {
        // First row holding the largest magnitude wins ties, like `i?amax`.
        let mut pivot = col;
        for r in col + 1..n {
            if a[ia(r, col)].abs() > a[ia(pivot, col)].abs() {
                pivot = r;
            }
        }
        if a[ia(pivot, col)] == T::ZERO {
            return Err(TensorError::Singular(col + 1));
        }
        if pivot != col {
            for c in 0..n {
                a.swap(ia(pivot, c), ia(col, c));
            }
            for j in 0..nrhs {
                b.swap(ib(pivot, j), ib(col, j));
            }
        }

        let diag = a[ia(col, col)];
        for r in col + 1..n {
            let f = a[ia(r, col)] / diag;
            a[ia(r, col)] = f;
            for c in col + 1..n {
                a[ia(r, c)] = a[ia(r, c)] - f * a[ia(col, c)];
            }
            for j in 0..nrhs {
                b[ib(r, j)] = b[ib(r, j)] - f * b[ib(col, j)];
            }
        }
    }

    // L was applied to B during elimination; back-substitute through U.
    for j in 0..nrhs {
        for r in (0..n).rev() {
            let mut sum = b[ib(r, j)];
            for c in r + 1..n {
                sum = sum - a[ia(r, c)] * b[ib(c, j)];
            }
            b[ib(r, j)] = sum / a[ia(r, r)];
        }
    }
    Ok(())
}
