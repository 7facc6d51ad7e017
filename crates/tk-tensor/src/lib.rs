//! `tk-tensor` - Runtime dtype registry and device-dispatched matmul and solve.
//!
//! This crate provides:
//! - `DType`, a fixed registry of element types with byte sizes and names,
//!   and the mapping from Rust primitive types to dtypes
//! - A `Tensor` type over shared, strided storage
//! - A `ComputeBackend` trait exposing BLAS-style GEMM and LAPACK-style
//!   `gesv` primitives
//! - A `CpuBackend` (reference kernels, or system CBLAS/LAPACKE with the
//!   `blas` feature)
//! - `MatmulDispatcher`, which validates operands and routes by device

pub mod backend;
pub mod cpu;
pub mod device;
pub mod dispatch;
pub mod dtype;
pub mod error;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use backend::{ComputeBackend, GemmArgs, Layout, SolveArgs, Transpose};
pub use cpu::CpuBackend;
pub use device::{Device, DeviceKind};
pub use dispatch::MatmulDispatcher;
pub use dtype::{DType, DTypeCode, DTypeInfo, Element};
pub use error::{ErrorKind, Result, TensorError};
pub use shape::Shape;
pub use storage::CpuStorage;
pub use tensor::Tensor;
