use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::backend::{ComputeBackend, GemmArgs, SolveArgs};
use crate::cpu::CpuBackend;
use crate::device::{Device, DeviceKind};
use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::tensor::Tensor;

/// Validates matmul and solve operands and routes them to the compute
/// backend registered for their device.
///
/// Holds no mutable state between calls; one dispatcher can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct MatmulDispatcher {
    backends: HashMap<DeviceKind, Arc<dyn ComputeBackend>>,
}

impl MatmulDispatcher {
    /// Dispatcher with `CpuBackend` registered for `DeviceKind::Cpu`.
    pub fn new() -> Self {
        Self::empty().with_backend(DeviceKind::Cpu, Arc::new(CpuBackend::new()))
    }

    /// Dispatcher with no backends; every matmul fails with
    /// `UnsupportedDevice` until one is registered.
    pub fn empty() -> Self {
        MatmulDispatcher {
            backends: HashMap::new(),
        }
    }

    pub fn with_backend(mut self, kind: DeviceKind, backend: Arc<dyn ComputeBackend>) -> Self {
        self.register(kind, backend);
        self
    }

    /// Routes `kind` to `backend`, returning the backend it replaced.
    pub fn register(
        &mut self,
        kind: DeviceKind,
        backend: Arc<dyn ComputeBackend>,
    ) -> Option<Arc<dyn ComputeBackend>> {
        debug!("registering {} backend for {} devices", backend.name(), kind);
        self.backends.insert(kind, backend)
    }

    pub fn backend_for(&self, device: Device) -> Option<&Arc<dyn ComputeBackend>> {
        self.backends.get(&device.kind())
    }

    /// Checks that `a` and `b` are valid matmul operands and returns
    /// `(m, k, n)`.
    ///
    /// Checks run in order: rank of A, rank of B, inner dimensions, dtype,
    /// device.
    pub fn check_operands(a: &Tensor, b: &Tensor) -> Result<(usize, usize, usize)> {
        check_rank_2("A", a)?;
        check_rank_2("B", b)?;

        let m = a.shape().dim(0);
        let k = a.shape().dim(1);
        let k2 = b.shape().dim(0);
        let n = b.shape().dim(1);
        if k != k2 {
            return Err(TensorError::MatmulMismatch { m, k, k2, n });
        }

        check_same_placement(a, b)?;
        Ok((m, k, n))
    }

    /// Checks that `a` and `b` are valid solve operands and returns
    /// `(n, nrhs)`.
    ///
    /// Checks run in order: rank of A, rank of B, A square, row counts,
    /// dtype, device.
    pub fn check_solve_operands(a: &Tensor, b: &Tensor) -> Result<(usize, usize)> {
        check_rank_2("A", a)?;
        check_rank_2("B", b)?;

        let n = a.shape().dim(0);
        let cols = a.shape().dim(1);
        if n != cols {
            return Err(TensorError::NotSquare { rows: n, cols });
        }
        let rows = b.shape().dim(0);
        if rows != n {
            return Err(TensorError::SolveMismatch { n, rows });
        }

        check_same_placement(a, b)?;
        Ok((n, b.shape().dim(1)))
    }

    fn route(&self, device: Device, dtype: DType, op: &str) -> Result<&Arc<dyn ComputeBackend>> {
        let backend = self
            .backend_for(device)
            .ok_or_else(|| TensorError::UnsupportedDevice(device.to_string()))?;
        if !backend.supports_dtype(dtype) {
            return Err(TensorError::UnsupportedDType(format!(
                "{} {} on {} backend",
                dtype,
                op,
                backend.name()
            )));
        }
        Ok(backend)
    }

    /// Computes `C = A @ B` for 2D tensors `A: [m, k]` and `B: [k, n]`.
    ///
    /// The result is a new `[m, n]` tensor with A's dtype and device. A and
    /// B are only read; strided operands are copied into dense buffers
    /// before the backend sees them.
    pub fn matmul(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (m, k, n) = Self::check_operands(a, b)?;
        let dtype = a.dtype();
        let device = a.device();

        let backend = self.route(device, dtype, "matmul")?;

        let mut c = Tensor::zeros([m, n], dtype, device)?;
        if m == 0 || n == 0 || k == 0 {
            // Nothing to accumulate; C is already the all-zero product.
            return Ok(c);
        }

        debug!(
            "matmul [{}x{}] @ [{}x{}] {} on {} via {}",
            m,
            k,
            k,
            n,
            dtype,
            device,
            backend.name()
        );

        let a = a.contiguous();
        let b = b.contiguous();
        let args = GemmArgs::row_major(m, n, k);
        match dtype {
            DType::Float32 => backend.gemm_f32(
                &args,
                1.0,
                a.as_slice::<f32>()?,
                b.as_slice::<f32>()?,
                0.0,
                c.as_mut_slice::<f32>()?,
            )?,
            DType::Float64 => backend.gemm_f64(
                &args,
                1.0,
                a.as_slice::<f64>()?,
                b.as_slice::<f64>()?,
                0.0,
                c.as_mut_slice::<f64>()?,
            )?,
            other => {
                return Err(TensorError::UnsupportedDType(format!(
                    "no gemm for {}",
                    other
                )))
            }
        }
        Ok(c)
    }

    /// Solves `A @ X = B` for a square `A: [n, n]` and `B: [n, nrhs]` by LU
    /// factorization with partial pivoting.
    ///
    /// Returns a new `[n, nrhs]` tensor with A's dtype and device. A and B
    /// are only read; the backend factors private dense copies. An exactly
    /// singular A fails with `Singular`.
    pub fn solve(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        let (n, nrhs) = Self::check_solve_operands(a, b)?;
        let dtype = a.dtype();
        let device = a.device();
        let backend = self.route(device, dtype, "solve")?;

        if n == 0 {
            return Tensor::zeros([0, nrhs], dtype, device);
        }

        debug!(
            "solve [{}x{}] \\ [{}x{}] {} on {} via {}",
            n,
            n,
            n,
            nrhs,
            dtype,
            device,
            backend.name()
        );

        let mut lu = a.dense_copy();
        let mut x = b.dense_copy();
        let args = SolveArgs::row_major(n, nrhs);
        match dtype {
            DType::Float32 => backend.gesv_f32(
                &args,
                lu.as_mut_slice::<f32>()?,
                x.as_mut_slice::<f32>()?,
            )?,
            DType::Float64 => backend.gesv_f64(
                &args,
                lu.as_mut_slice::<f64>()?,
                x.as_mut_slice::<f64>()?,
            )?,
            other => {
                return Err(TensorError::UnsupportedDType(format!(
                    "no gesv for {}",
                    other
                )))
            }
        }
        Ok(x)
    }
}

fn check_rank_2(operand: &'static str, t: &Tensor) -> Result<()> {
    if t.rank() != 2 {
        return Err(TensorError::RankMismatch {
            operand,
            rank: t.rank(),
        });
    }
    Ok(())
}

fn check_same_placement(a: &Tensor, b: &Tensor) -> Result<()> {
    if a.dtype() != b.dtype() {
        return Err(TensorError::DTypeMismatch {
            expected: a.dtype().to_string(),
            got: b.dtype().to_string(),
        });
    }
    if a.device() != b.device() {
        return Err(TensorError::DeviceMismatch {
            expected: a.device().to_string(),
            got: b.device().to_string(),
        });
    }
    Ok(())
}

impl Default for MatmulDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
