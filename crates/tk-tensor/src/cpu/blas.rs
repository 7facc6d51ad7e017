// CBLAS-backed GEMM and LAPACKE-backed solve, enabled with the `blas`
// feature.
//
// The system BLAS/LAPACK library is picked at link time (OpenBLAS, MKL,
// Accelerate).

use crate::backend::{GemmArgs, Layout, SolveArgs, Transpose};
use crate::error::{Result, TensorError};

fn to_i32(name: &str, v: usize) -> Result<i32> {
    i32::try_from(v).map_err(|_| {
        TensorError::Backend(format!("{}={} exceeds i32::MAX (BLAS limitation)", name, v))
    })
}

fn layout(l: Layout) -> cblas::Layout {
    match l {
        Layout::RowMajor => cblas::Layout::RowMajor,
        Layout::ColMajor => cblas::Layout::ColumnMajor,
    }
}

fn transpose(t: Transpose) -> cblas::Transpose {
    match t {
        Transpose::None => cblas::Transpose::None,
        Transpose::Trans => cblas::Transpose::Ordinary,
    }
}

struct Dims {
    m: i32,
    n: i32,
    k: i32,
    lda: i32,
    ldb: i32,
    ldc: i32,
}

fn dims(args: &GemmArgs) -> Result<Dims> {
    Ok(Dims {
        m: to_i32("m", args.m)?,
        n: to_i32("n", args.n)?,
        k: to_i32("k", args.k)?,
        lda: to_i32("lda", args.lda)?,
        ldb: to_i32("ldb", args.ldb)?,
        ldc: to_i32("ldc", args.ldc)?,
    })
}

pub(crate) fn sgemm(
    args: &GemmArgs,
    alpha: f32,
    a: &[f32],
    b: &[f32],
    beta: f32,
    c: &mut [f32],
) -> Result<()> {
    args.validate(a.len(), b.len(), c.len())?;
    let d = dims(args)?;
    // SAFETY: buffer lengths were checked against the leading dimensions above.
    unsafe {
        cblas::sgemm(
            layout(args.layout),
            transpose(args.trans_a),
            transpose(args.trans_b),
            d.m,
            d.n,
            d.k,
            alpha,
            a,
            d.lda,
            b,
            d.ldb,
            beta,
            c,
            d.ldc,
        );
    }
    Ok(())
}

pub(crate) fn dgemm(
    args: &GemmArgs,
    alpha: f64,
    a: &[f64],
    b: &[f64],
    beta: f64,
    c: &mut [f64],
) -> Result<()> {
    args.validate(a.len(), b.len(), c.len())?;
    let d = dims(args)?;
    // SAFETY: buffer lengths were checked against the leading dimensions above.
    unsafe {
        cblas::dgemm(
            layout(args.layout),
            transpose(args.trans_a),
            transpose(args.trans_b),
            d.m,
            d.n,
            d.k,
            alpha,
            a,
            d.lda,
            b,
            d.ldb,
            beta,
            c,
            d.ldc,
        );
    }
    Ok(())
}

fn lapack_layout(l: Layout) -> lapacke::Layout {
    match l {
        Layout::RowMajor => lapacke::Layout::RowMajor,
        Layout::ColMajor => lapacke::Layout::ColumnMajor,
    }
}

struct SolveDims {
    n: i32,
    nrhs: i32,
    lda: i32,
    ldb: i32,
}

fn solve_dims(args: &SolveArgs) -> Result<SolveDims> {
    Ok(SolveDims {
        n: to_i32("n", args.n)?,
        nrhs: to_i32("nrhs", args.nrhs)?,
        lda: to_i32("lda", args.lda)?,
        ldb: to_i32("ldb", args.ldb)?,
    })
}

fn check_info(info: i32) -> Result<()> {
    match info {
        0 => Ok(()),
        i if i > 0 => Err(TensorError::Singular(i as usize)),
        i => Err(TensorError::Backend(format!(
            "gesv: argument {} had an illegal value",
            -i
        ))),
    }
}

pub(crate) fn sgesv(args: &SolveArgs, a: &mut [f32], b: &mut [f32]) -> Result<()> {
    args.validate(a.len(), b.len())?;
    let d = solve_dims(args)?;
    let mut ipiv = vec![0i32; args.n];
    // SAFETY: buffer lengths were checked against the leading dimensions above.
    let info = unsafe {
        lapacke::sgesv(
            lapack_layout(args.layout),
            d.n,
            d.nrhs,
            a,
            d.lda,
            &mut ipiv,
            b,
            d.ldb,
        )
    };
    check_info(info)
}

pub(crate) fn dgesv(args: &SolveArgs, a: &mut [f64], b: &mut [f64]) -> Result<()> {
    args.validate(a.len(), b.len())?;
    let d = solve_dims(args)?;
    let mut ipiv = vec![0i32; args.n];
    // SAFETY: buffer lengths were checked against the leading dimensions above.
    let info = unsafe {
        lapacke::dgesv(
            lapack_layout(args.layout),
            d.n,
            d.nrhs,
            a,
            d.lda,
            &mut ipiv,
            b,
            d.ldb,
        )
    };
    check_info(info)
}
