use crate::dtype::{DType, Element};
use crate::error::{Result, TensorError};

/// Host-side typed tensor storage.
///
/// One variant per concrete dtype. Tensors hold it behind an `Arc` so views
/// can share a buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum CpuStorage {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    Bool(Vec<bool>),
}

macro_rules! each_variant {
    ($storage:expr, $v:ident => $body:expr) => {
        match $storage {
            CpuStorage::F32($v) => $body,
            CpuStorage::F64($v) => $body,
            CpuStorage::I32($v) => $body,
            CpuStorage::I64($v) => $body,
            CpuStorage::U8($v) => $body,
            CpuStorage::U16($v) => $body,
            CpuStorage::Bool($v) => $body,
        }
    };
}

macro_rules! map_variant {
    ($storage:expr, $v:ident => $body:expr) => {
        match $storage {
            CpuStorage::F32($v) => CpuStorage::F32($body),
            CpuStorage::F64($v) => CpuStorage::F64($body),
            CpuStorage::I32($v) => CpuStorage::I32($body),
            CpuStorage::I64($v) => CpuStorage::I64($body),
            CpuStorage::U8($v) => CpuStorage::U8($body),
            CpuStorage::U16($v) => CpuStorage::U16($body),
            CpuStorage::Bool($v) => CpuStorage::Bool($body),
        }
    };
}

impl CpuStorage {
    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            CpuStorage::F32(_) => DType::Float32,
            CpuStorage::F64(_) => DType::Float64,
            CpuStorage::I32(_) => DType::Int32,
            CpuStorage::I64(_) => DType::Int64,
            CpuStorage::U8(_) => DType::UInt8,
            CpuStorage::U16(_) => DType::UInt16,
            CpuStorage::Bool(_) => DType::Bool,
        }
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        each_variant!(self, v => size_of_elem(&v[..]))
    }

    /// Allocated size in bytes.
    pub fn nbytes(&self) -> usize {
        each_variant!(self, v => std::mem::size_of_val(&v[..]))
    }

    /// Address of the first element.
    pub fn as_ptr(&self) -> *const u8 {
        each_variant!(self, v => v.as_ptr() as *const u8)
    }

    /// Create zero-filled storage for the given dtype and element count.
    ///
    /// # Errors
    /// Returns `UnsupportedDType` for `Undefined`.
    pub fn zeros(dtype: DType, n: usize) -> Result<Self> {
        match dtype {
            DType::Float32 => Ok(CpuStorage::F32(vec![0.0; n])),
            DType::Float64 => Ok(CpuStorage::F64(vec![0.0; n])),
            DType::Int32 => Ok(CpuStorage::I32(vec![0; n])),
            DType::Int64 => Ok(CpuStorage::I64(vec![0; n])),
            DType::UInt8 => Ok(CpuStorage::U8(vec![0; n])),
            DType::UInt16 => Ok(CpuStorage::U16(vec![0; n])),
            DType::Bool => Ok(CpuStorage::Bool(vec![false; n])),
            DType::Undefined => Err(TensorError::UnsupportedDType(
                "cannot allocate storage for Undefined".to_string(),
            )),
        }
    }

    pub fn from_vec<T: Element>(data: Vec<T>) -> Self {
        T::into_storage(data)
    }

    /// Borrows the data as a `T` slice.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` if `T` is not this storage's element type.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        T::slice(self).ok_or_else(|| TensorError::DTypeMismatch {
            expected: T::DTYPE.to_string(),
            got: self.dtype().to_string(),
        })
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        let got = self.dtype();
        T::slice_mut(self).ok_or_else(|| TensorError::DTypeMismatch {
            expected: T::DTYPE.to_string(),
            got: got.to_string(),
        })
    }

    /// Copies the elements at `indices`, in order, into new dense storage.
    ///
    /// # Panics
    /// Panics if any index is out of bounds.
    pub fn gather(&self, indices: &[usize]) -> CpuStorage {
        map_variant!(self, v => indices.iter().map(|&i| v[i]).collect())
    }
}

fn size_of_elem<T>(_: &[T]) -> usize {
    std::mem::size_of::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec() {
        let s = CpuStorage::from_vec(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(s.len(), 3);
        assert!(!s.is_empty());
        assert_eq!(s.dtype(), DType::Float32);
        assert_eq!(s.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zeros_every_dtype() {
        for dtype in DType::ALL {
            let s = CpuStorage::zeros(dtype, 5).unwrap();
            assert_eq!(s.len(), 5);
            assert_eq!(s.dtype(), dtype);
            assert_eq!(s.element_size(), dtype.byte_size().unwrap());
            assert_eq!(s.nbytes(), 5 * dtype.byte_size().unwrap());
        }
        assert_eq!(
            CpuStorage::zeros(DType::Int64, 3).unwrap().as_slice::<i64>().unwrap(),
            &[0, 0, 0]
        );
    }

    #[test]
    fn test_zeros_undefined() {
        assert!(CpuStorage::zeros(DType::Undefined, 5).is_err());
    }

    #[test]
    fn test_empty_element_size() {
        let s = CpuStorage::zeros(DType::UInt16, 0).unwrap();
        assert_eq!(s.element_size(), 2);
        assert_eq!(s.nbytes(), 0);
    }

    #[test]
    fn test_slice_dtype_mismatch() {
        let s = CpuStorage::from_vec(vec![1i32, 2]);
        let err = s.as_slice::<f32>().unwrap_err();
        assert!(matches!(err, TensorError::DTypeMismatch { .. }));
    }

    #[test]
    fn test_mut_slice() {
        let mut s = CpuStorage::from_vec(vec![1.0f64, 2.0]);
        s.as_mut_slice::<f64>().unwrap()[0] = 42.0;
        assert_eq!(s.as_slice::<f64>().unwrap()[0], 42.0);
    }

    #[test]
    fn test_gather() {
        let s = CpuStorage::from_vec(vec![10u8, 20, 30, 40]);
        let g = s.gather(&[3, 1, 1]);
        assert_eq!(g.as_slice::<u8>().unwrap(), &[40, 20, 20]);
    }
}
