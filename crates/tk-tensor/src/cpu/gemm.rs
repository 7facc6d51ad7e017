// Reference GEMM kernel.
//
// Straight triple loop, no blocking or SIMD. Accumulation order is fixed
// (p = 0..k), so repeated calls on the same inputs are bit-identical.

use std::ops::{Add, Div, Mul, Sub};

use crate::backend::{GemmArgs, Layout, Transpose};
use crate::error::Result;

pub(crate) trait Scalar:
    Copy
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    const ZERO: Self;

    fn abs(self) -> Self;
}

impl Scalar for f32 {
    const ZERO: Self = 0.0;

    fn abs(self) -> Self {
        f32::abs(self)
    }
}

impl Scalar for f64 {
    const ZERO: Self = 0.0;

    fn abs(self) -> Self {
        f64::abs(self)
    }
}

#[inline]
pub(crate) fn index(layout: Layout, ld: usize, row: usize, col: usize) -> usize {
    match layout {
        Layout::RowMajor => row * ld + col,
        Layout::ColMajor => col * ld + row,
    }
}

#[inline]
fn at<T: Copy>(buf: &[T], layout: Layout, ld: usize, row: usize, col: usize) -> T {
    buf[index(layout, ld, row, col)]
}

#[inline]
fn op_at<T: Copy>(
    buf: &[T],
    layout: Layout,
    trans: Transpose,
    ld: usize,
    row: usize,
    col: usize,
) -> T {
    match trans {
        Transpose::None => at(buf, layout, ld, row, col),
        Transpose::Trans => at(buf, layout, ld, col, row),
    }
}

/// `C = alpha * op(A) @ op(B) + beta * C`.
///
/// With `beta == 0` the previous contents of C are overwritten without being
/// read, matching BLAS semantics.
pub(crate) fn gemm<T: Scalar>(
    args: &GemmArgs,
    alpha: T,
    a: &[T],
    b: &[T],
    beta: T,
    c: &mut [T],
) -> Result<()> {
    args.validate(a.len(), b.len(), c.len())?;

    for i in 0..args.m {
        for j in 0..args.n {
            let mut sum = T::ZERO;
            for p in 0..args.k {
                sum = sum
                    + op_at(a, args.layout, args.trans_a, args.lda, i, p)
                        * op_at(b, args.layout, args.trans_b, args.ldb, p, j);
            }
            let idx = index(args.layout, args.ldc, i, j);
            c[idx] = if beta == T::ZERO {
                alpha * sum
            } else {
                alpha * sum + beta * c[idx]
            };
        }
    }
    Ok(())
}
