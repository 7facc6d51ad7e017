#[cfg(feature = "blas")]
mod blas;
#[cfg_attr(feature = "blas", allow(dead_code))]
mod gemm;
#[cfg_attr(feature = "blas", allow(dead_code))]
mod solve;

use crate::backend::{ComputeBackend, GemmArgs, SolveArgs};
use crate::dtype::DType;
use crate::error::Result;

/// CPU compute backend.
///
/// Uses the pure-Rust reference GEMM and LU solver by default, or the system
/// CBLAS and LAPACKE when built with the `blas` feature.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        if cfg!(feature = "blas") {
            "cpu-blas"
        } else {
            "cpu"
        }
    }

    fn supports_dtype(&self, dtype: DType) -> bool {
        matches!(dtype, DType::Float32 | DType::Float64)
    }

    fn gemm_f32(
        &self,
        args: &GemmArgs,
        alpha: f32,
        a: &[f32],
        b: &[f32],
        beta: f32,
        c: &mut [f32],
    ) -> Result<()> {
        #[cfg(feature = "blas")]
        {
            blas::sgemm(args, alpha, a, b, beta, c)
        }
        #[cfg(not(feature = "blas"))]
        {
            gemm::gemm(args, alpha, a, b, beta, c)
        }
    }

    fn gemm_f64(
        &self,
        args: &GemmArgs,
        alpha: f64,
        a: &[f64],
        b: &[f64],
        beta: f64,
        c: &mut [f64],
    ) -> Result<()> {
        #[cfg(feature = "blas")]
        {
            blas::dgemm(args, alpha, a, b, beta, c)
        }
        #[cfg(not(feature = "blas"))]
        {
            gemm::gemm(args, alpha, a, b, beta, c)
        }
    }

    fn gesv_f32(&self, args: &SolveArgs, a: &mut [f32], b: &mut [f32]) -> Result<()> {
        #[cfg(feature = "blas")]
        {
            blas::sgesv(args, a, b)
        }
        #[cfg(not(feature = "blas"))]
        {
            solve::gesv(args, a, b)
        }
    }

    fn gesv_f64(&self, args: &SolveArgs, a: &mut [f64], b: &mut [f64]) -> Result<()> {
        #[cfg(feature = "blas")]
        {
            blas::dgesv(args, a, b)
        }
        #[cfg(not(feature = "blas"))]
        {
            solve::gesv(args, a, b)
        }
    }
}
