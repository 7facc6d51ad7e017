use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("unsupported data type: {0}")]
    UnsupportedDType(String),
    #[error("tensor {operand} must be 2D, but got {rank}D")]
    RankMismatch { operand: &'static str, rank: usize },
    #[error("tensor A columns {k} mismatch with tensor B rows {k2}: [{m}x{k}] @ [{k2}x{n}]")]
    MatmulMismatch {
        m: usize,
        k: usize,
        k2: usize,
        n: usize,
    },
    #[error("tensor A must be square, but got [{rows}x{cols}]")]
    NotSquare { rows: usize, cols: usize },
    #[error("tensor A rows {n} mismatch with tensor B rows {rows}")]
    SolveMismatch { n: usize, rows: usize },
    #[error("shape {0:?} has more elements than fit in usize")]
    ShapeOverflow(Vec<usize>),
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("invalid axis {axis} for tensor with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },
    #[error("range {start}..{start}+{len} out of bounds for dimension {dim} of size {size}")]
    InvalidRange {
        dim: usize,
        start: usize,
        len: usize,
        size: usize,
    },
    #[error("tensor with shape {0:?} is not contiguous")]
    NotContiguous(Vec<usize>),
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: String, got: String },
    #[error("device mismatch: expected {expected}, got {got}")]
    DeviceMismatch { expected: String, got: String },
    #[error("no compute backend registered for device {0}")]
    UnsupportedDevice(String),
    #[error("cannot write through storage shared with another tensor")]
    SharedStorage,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("U({0},{0}) is exactly zero, so the matrix is singular")]
    Singular(usize),
}

/// Coarse classification of [`TensorError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A dtype lookup hit a type or tag outside the supported set.
    UnsupportedType,
    /// Operand rank, dimension or range is invalid.
    Shape,
    /// Operands disagree on dtype or device.
    TypeOrDeviceMismatch,
    /// The compute backend rejected the call or is missing.
    Backend,
    /// The coefficient matrix of a solve has no inverse.
    Singular,
}

impl TensorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TensorError::UnsupportedDType(_) => ErrorKind::UnsupportedType,
            TensorError::RankMismatch { .. }
            | TensorError::MatmulMismatch { .. }
            | TensorError::NotSquare { .. }
            | TensorError::SolveMismatch { .. }
            | TensorError::ShapeOverflow(_)
            | TensorError::ShapeMismatch { .. }
            | TensorError::InvalidAxis { .. }
            | TensorError::InvalidRange { .. }
            | TensorError::NotContiguous(_) => ErrorKind::Shape,
            TensorError::DTypeMismatch { .. } | TensorError::DeviceMismatch { .. } => {
                ErrorKind::TypeOrDeviceMismatch
            }
            TensorError::UnsupportedDevice(_)
            | TensorError::SharedStorage
            | TensorError::Backend(_) => ErrorKind::Backend,
            TensorError::Singular(_) => ErrorKind::Singular,
        }
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;
