use std::sync::Arc;

use log::trace;

use crate::device::Device;
use crate::dispatch::MatmulDispatcher;
use crate::dtype::{DType, Element};
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::CpuStorage;

/// A shaped, typed view over a shared storage buffer.
///
/// Views created by `transpose`, `narrow` and `reshape` share the buffer
/// through an `Arc`; it is freed when the last view is dropped. A tensor's
/// dtype and device never change. Strides and offset are in elements.
#[derive(Debug, Clone)]
pub struct Tensor {
    storage: Arc<CpuStorage>,
    shape: Shape,
    strides: Vec<usize>,
    offset: usize,
    dtype: DType,
    device: Device,
}

impl Tensor {
    fn from_storage(storage: CpuStorage, shape: Shape, device: Device) -> Self {
        let strides = shape.strides();
        Tensor {
            dtype: storage.dtype(),
            storage: Arc::new(storage),
            shape,
            strides,
            offset: 0,
            device,
        }
    }

    fn view(&self, shape: Shape, strides: Vec<usize>, offset: usize) -> Self {
        let extent = shape.extent(&strides);
        debug_assert!(
            extent == 0 || offset + extent <= self.storage.len(),
            "view {} at offset {} with strides {:?} overruns storage of {} elements",
            shape,
            offset,
            strides,
            self.storage.len()
        );
        Tensor {
            storage: Arc::clone(&self.storage),
            shape,
            strides,
            offset,
            dtype: self.dtype,
            device: self.device,
        }
    }

    /// Create a zero-filled tensor with `dtype.byte_size() * shape.numel()`
    /// bytes of storage.
    ///
    /// # Errors
    /// Returns `UnsupportedDType` for `DType::Undefined` and `ShapeOverflow`
    /// when the element or byte count does not fit in `usize`/`isize`.
    pub fn zeros(shape: impl Into<Shape>, dtype: DType, device: Device) -> Result<Self> {
        let shape = shape.into();
        let numel = shape.checked_numel()?;
        numel
            .checked_mul(dtype.byte_size()?)
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .ok_or_else(|| TensorError::ShapeOverflow(shape.dims().to_vec()))?;
        let storage = CpuStorage::zeros(dtype, numel)?;
        Ok(Self::from_storage(storage, shape, device))
    }

    /// Create a CPU tensor from owned data laid out in row-major order.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        Self::from_vec_on(data, shape, Device::Cpu)
    }

    /// Like [`Tensor::from_vec`], tagging the result with `device`.
    pub fn from_vec_on<T: Element>(
        data: Vec<T>,
        shape: impl Into<Shape>,
        device: Device,
    ) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.checked_numel()? {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Self::from_storage(CpuStorage::from_vec(data), shape, device))
    }

    /// Rank-0 CPU tensor holding a single value.
    pub fn scalar<T: Element>(value: T) -> Self {
        Self::from_storage(CpuStorage::from_vec(vec![value]), Shape::scalar(), Device::Cpu)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Offset of the first element into the storage, in elements.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Logical size in bytes (`byte_size * numel`).
    pub fn nbytes(&self) -> usize {
        self.numel() * self.storage.element_size()
    }

    pub fn storage(&self) -> &CpuStorage {
        &self.storage
    }

    /// Address of the first logical element.
    pub fn data_ptr(&self) -> *const u8 {
        self.storage
            .as_ptr()
            .wrapping_add(self.offset * self.storage.element_size())
    }

    /// Whether elements are laid out densely in row-major order.
    pub fn is_contiguous(&self) -> bool {
        self.shape.is_contiguous(&self.strides)
    }

    /// Whether both tensors view the same buffer.
    pub fn shares_storage(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.storage, &other.storage)
    }

    /// Storage positions of every element, in logical row-major order.
    fn element_indices(&self) -> Vec<usize> {
        let numel = self.numel();
        let mut out = Vec::with_capacity(numel);
        if numel == 0 {
            return out;
        }
        let ndim = self.rank();
        let mut index = vec![0usize; ndim];
        let mut pos = self.offset;
        for _ in 0..numel {
            out.push(pos);
            for d in (0..ndim).rev() {
                index[d] += 1;
                pos += self.strides[d];
                if index[d] < self.shape.dim(d) {
                    break;
                }
                pos -= self.strides[d] * index[d];
                index[d] = 0;
            }
        }
        out
    }

    fn materialize(&self, device: Device) -> Tensor {
        let storage = self.storage.gather(&self.element_indices());
        Tensor::from_storage(storage, self.shape.clone(), device)
    }

    /// Returns a dense row-major tensor with the same contents.
    ///
    /// Already-contiguous tensors are returned as an aliasing view with no
    /// copy; anything else is copied into a fresh buffer.
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() {
            return self.clone();
        }
        trace!(
            "contiguous: copying {} {} elements of shape {}",
            self.numel(),
            self.dtype,
            self.shape
        );
        self.materialize(self.device)
    }

    /// Dense copy in a buffer no other tensor holds.
    pub(crate) fn dense_copy(&self) -> Tensor {
        self.materialize(self.device)
    }

    /// Copies the tensor into a fresh buffer tagged with `device`.
    ///
    /// Storage is host memory for every device; the tag only selects the
    /// compute backend.
    pub fn to_device(&self, device: Device) -> Tensor {
        self.materialize(device)
    }

    /// Borrows the elements of a contiguous tensor.
    ///
    /// # Errors
    /// `NotContiguous` for strided views, `DTypeMismatch` if `T` does not
    /// match the tensor's dtype.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        if !self.is_contiguous() {
            return Err(TensorError::NotContiguous(self.dims().to_vec()));
        }
        let data = self.storage.as_slice::<T>()?;
        if self.numel() == 0 {
            return Ok(Default::default());
        }
        data.get(self.offset..self.offset + self.numel())
            .ok_or_else(|| TensorError::NotContiguous(self.dims().to_vec()))
    }

    /// Mutable access for a tensor that exclusively owns its buffer.
    ///
    /// # Errors
    /// `SharedStorage` if any other view holds the same buffer.
    pub(crate) fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        if !self.is_contiguous() {
            return Err(TensorError::NotContiguous(self.dims().to_vec()));
        }
        let (offset, numel) = (self.offset, self.numel());
        let storage = Arc::get_mut(&mut self.storage).ok_or(TensorError::SharedStorage)?;
        let data = storage.as_mut_slice::<T>()?;
        if numel == 0 {
            return Ok(Default::default());
        }
        let shape = &self.shape;
        data.get_mut(offset..offset + numel)
            .ok_or_else(|| TensorError::NotContiguous(shape.dims().to_vec()))
    }

    /// Copies the elements out in logical row-major order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let data = self.storage.as_slice::<T>()?;
        Ok(self.element_indices().into_iter().map(|i| data[i]).collect())
    }

    /// Swaps two dimensions, sharing the buffer.
    pub fn transpose(&self, d0: usize, d1: usize) -> Result<Tensor> {
        let ndim = self.rank();
        for axis in [d0, d1] {
            if axis >= ndim {
                return Err(TensorError::InvalidAxis { axis, ndim });
            }
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.swap(d0, d1);
        strides.swap(d0, d1);
        Ok(self.view(Shape::new(dims), strides, self.offset))
    }

    /// Transpose of a 2D tensor.
    pub fn t(&self) -> Result<Tensor> {
        if self.rank() != 2 {
            return Err(TensorError::RankMismatch {
                operand: "input",
                rank: self.rank(),
            });
        }
        self.transpose(0, 1)
    }

    /// Restricts dimension `dim` to `start..start + len`, sharing the buffer.
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Tensor> {
        let ndim = self.rank();
        if dim >= ndim {
            return Err(TensorError::InvalidAxis { axis: dim, ndim });
        }
        let size = self.shape.dim(dim);
        if start.checked_add(len).map_or(true, |end| end > size) {
            return Err(TensorError::InvalidRange {
                dim,
                start,
                len,
                size,
            });
        }
        let mut dims = self.dims().to_vec();
        dims[dim] = len;
        let offset = self.offset + start * self.strides[dim];
        Ok(self.view(Shape::new(dims), self.strides.clone(), offset))
    }

    /// Reshape the tensor. The total number of elements must remain the same.
    ///
    /// Contiguous tensors are reshaped in place as a view; strided ones are
    /// copied first.
    pub fn reshape(&self, new_shape: impl Into<Shape>) -> Result<Tensor> {
        let new_shape = new_shape.into();
        if self.numel() != new_shape.checked_numel()? {
            return Err(TensorError::ShapeMismatch {
                expected: self.dims().to_vec(),
                got: new_shape.dims().to_vec(),
            });
        }
        let base = self.contiguous();
        let strides = new_shape.strides();
        Ok(base.view(new_shape, strides, base.offset))
    }

    /// Matrix multiplication of two 2D tensors: self is [m, k], other is
    /// [k, n], result is [m, n].
    pub fn matmul(&self, other: &Tensor, dispatcher: &MatmulDispatcher) -> Result<Tensor> {
        dispatcher.matmul(self, other)
    }

    /// Solves `self @ X = rhs` for a square `[n, n]` tensor and an
    /// `[n, nrhs]` right-hand side.
    pub fn solve(&self, rhs: &Tensor, dispatcher: &MatmulDispatcher) -> Result<Tensor> {
        dispatcher.solve(self, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tensor {
        Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap()
    }

    #[test]
    fn test_new_tensor() {
        let t = sample();
        assert_eq!(t.rank(), 2);
        assert_eq!(t.dims(), &[2, 3]);
        assert_eq!(t.dtype(), DType::Float32);
        assert_eq!(t.device(), Device::Cpu);
        assert_eq!(t.strides(), &[3, 1]);
        assert!(t.is_contiguous());
        assert_eq!(t.nbytes(), 24);
        assert_eq!(t.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        let err = Tensor::from_vec(vec![1.0f32, 2.0], [3]).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_zeros_every_dtype() {
        for dtype in DType::ALL {
            let t = Tensor::zeros([2, 2], dtype, Device::Cpu).unwrap();
            assert_eq!(t.dtype(), dtype);
            assert_eq!(t.nbytes(), 4 * dtype.byte_size().unwrap());
            assert_eq!(t.storage().nbytes(), t.nbytes());
        }
        let t = Tensor::zeros([3], DType::Int32, Device::Cuda(0)).unwrap();
        assert_eq!(t.to_vec::<i32>().unwrap(), vec![0, 0, 0]);
        assert_eq!(t.device(), Device::Cuda(0));
    }

    #[test]
    fn test_zeros_undefined() {
        let err = Tensor::zeros([2], DType::Undefined, Device::Cpu).unwrap_err();
        assert!(matches!(err, TensorError::UnsupportedDType(_)));
    }

    #[test]
    fn test_scalar_and_empty() {
        let s = Tensor::scalar(7i64);
        assert_eq!(s.rank(), 0);
        assert_eq!(s.numel(), 1);
        assert_eq!(s.to_vec::<i64>().unwrap(), vec![7]);

        let e = Tensor::zeros([0, 4], DType::Float64, Device::Cpu).unwrap();
        assert_eq!(e.numel(), 0);
        assert_eq!(e.nbytes(), 0);
        assert!(e.to_vec::<f64>().unwrap().is_empty());
        assert!(e.as_slice::<f64>().unwrap().is_empty());
    }

    #[test]
    fn test_transpose_is_strided_view() {
        let t = sample();
        let tt = t.t().unwrap();
        assert_eq!(tt.dims(), &[3, 2]);
        assert_eq!(tt.strides(), &[1, 3]);
        assert!(!tt.is_contiguous());
        assert!(tt.shares_storage(&t));
        assert_eq!(tt.to_vec::<f32>().unwrap(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(matches!(
            tt.as_slice::<f32>(),
            Err(TensorError::NotContiguous(_))
        ));
    }

    #[test]
    fn test_transpose_invalid_axis() {
        let err = sample().transpose(0, 2).unwrap_err();
        assert!(matches!(err, TensorError::InvalidAxis { axis: 2, ndim: 2 }));
        assert!(Tensor::from_vec(vec![1u8], [1]).unwrap().t().is_err());
    }

    #[test]
    fn test_contiguous_aliases_dense_tensor() {
        let t = sample();
        let c = t.contiguous();
        assert!(c.shares_storage(&t));
        assert_eq!(c.data_ptr(), t.data_ptr());
    }

    #[test]
    fn test_contiguous_copies_strided_view() {
        let t = sample();
        let c = t.t().unwrap().contiguous();
        assert!(!c.shares_storage(&t));
        assert!(c.is_contiguous());
        assert_eq!(c.as_slice::<f32>().unwrap(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        // Source untouched.
        assert_eq!(t.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_narrow() {
        let t = sample();
        let row = t.narrow(0, 1, 1).unwrap();
        assert_eq!(row.dims(), &[1, 3]);
        assert_eq!(row.offset(), 3);
        assert!(row.is_contiguous());
        assert_eq!(row.as_slice::<f32>().unwrap(), &[4.0, 5.0, 6.0]);
        assert_eq!(row.data_ptr(), t.data_ptr().wrapping_add(12));

        let col = t.narrow(1, 1, 2).unwrap();
        assert!(!col.is_contiguous());
        assert_eq!(col.to_vec::<f32>().unwrap(), vec![2.0, 3.0, 5.0, 6.0]);
    }

    #[test]
    fn test_narrow_out_of_range() {
        let t = sample();
        assert!(matches!(
            t.narrow(1, 2, 2),
            Err(TensorError::InvalidRange { size: 3, .. })
        ));
        assert!(t.narrow(1, usize::MAX, 2).is_err());
        assert!(t.narrow(5, 0, 1).is_err());
    }

    #[test]
    fn test_reshape() {
        let t = sample();
        let r = t.reshape([3, 2]).unwrap();
        assert_eq!(r.dims(), &[3, 2]);
        assert!(r.shares_storage(&t));
        assert_eq!(r.to_vec::<f32>().unwrap(), t.to_vec::<f32>().unwrap());
    }

    #[test]
    fn test_reshape_strided_copies() {
        let t = sample();
        let r = t.t().unwrap().reshape([6]).unwrap();
        assert!(!r.shares_storage(&t));
        assert_eq!(r.to_vec::<f32>().unwrap(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_reshape_mismatch() {
        let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0], [3]).unwrap();
        assert!(t.reshape([2, 2]).is_err());
    }

    #[test]
    fn test_overflowing_shapes_rejected() {
        let huge = [usize::MAX / 2, 3];
        assert_eq!(
            Tensor::zeros(huge, DType::UInt8, Device::Cpu).unwrap_err(),
            TensorError::ShapeOverflow(huge.to_vec())
        );
        assert!(matches!(
            Tensor::from_vec(vec![1u8; 3], huge),
            Err(TensorError::ShapeOverflow(_))
        ));
        let empty = Tensor::zeros([0, 3], DType::UInt8, Device::Cpu).unwrap();
        assert!(matches!(
            empty.reshape([0, usize::MAX, 2]),
            Err(TensorError::ShapeOverflow(_))
        ));
        // Element count fits, byte count does not.
        assert!(matches!(
            Tensor::zeros([usize::MAX / 4 + 1], DType::Float32, Device::Cpu),
            Err(TensorError::ShapeOverflow(_))
        ));
        // Zero elements, and the non-zero dims still fit.
        let wide = Tensor::zeros([usize::MAX / 2, 0], DType::UInt8, Device::Cpu).unwrap();
        assert_eq!(wide.numel(), 0);
    }

    #[test]
    fn test_views_stay_inside_storage() {
        let t = Tensor::from_vec((0..24).map(|i| i as f32).collect(), [2, 3, 4]).unwrap();
        let views = [
            t.transpose(0, 2).unwrap(),
            t.narrow(2, 1, 3).unwrap(),
            t.narrow(0, 1, 1).unwrap().transpose(1, 2).unwrap(),
            t.narrow(1, 3, 0).unwrap(),
            t.reshape([6, 4]).unwrap().narrow(0, 5, 1).unwrap(),
        ];
        for v in &views {
            assert!(v.offset() + v.shape().extent(v.strides()) <= v.storage().len());
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "overruns storage")]
    fn test_view_past_end_asserts() {
        let t = sample();
        let _ = t.view(Shape::from([2, 3]), vec![3, 1], 1);
    }

    #[test]
    fn test_to_device_copies() {
        let t = sample();
        let moved = t.to_device(Device::Cuda(1));
        assert_eq!(moved.device(), Device::Cuda(1));
        assert_eq!(moved.dtype(), t.dtype());
        assert!(!moved.shares_storage(&t));
        assert_eq!(t.device(), Device::Cpu);
    }

    #[test]
    fn test_typed_access_mismatch() {
        let t = sample();
        assert!(matches!(
            t.to_vec::<i32>(),
            Err(TensorError::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_mut_slice_refuses_shared_buffer() {
        let mut t = sample();
        let alias = t.clone();
        assert!(matches!(
            t.as_mut_slice::<f32>(),
            Err(TensorError::SharedStorage)
        ));
        drop(alias);
        t.as_mut_slice::<f32>().unwrap()[0] = 9.0;
        assert_eq!(t.to_vec::<f32>().unwrap()[0], 9.0);
    }

    #[test]
    fn test_slice_past_end_reports_shape() {
        // Hand-built: a dense [4] view over a 3-element buffer.
        let mut t = Tensor {
            storage: Arc::new(CpuStorage::from_vec(vec![1.0f32, 2.0, 3.0])),
            shape: Shape::from([4]),
            strides: vec![1],
            offset: 0,
            dtype: DType::Float32,
            device: Device::Cpu,
        };
        assert_eq!(
            t.as_slice::<f32>().unwrap_err(),
            TensorError::NotContiguous(vec![4])
        );
        assert_eq!(
            t.as_mut_slice::<f32>().unwrap_err(),
            TensorError::NotContiguous(vec![4])
        );
    }

    #[test]
    fn test_solve() {
        let dispatcher = MatmulDispatcher::new();
        // 2x + 3y = 5, 4x + 5y = 11
        let a = Tensor::from_vec(vec![2.0f64, 3.0, 4.0, 5.0], [2, 2]).unwrap();
        let b = Tensor::from_vec(vec![5.0f64, 11.0], [2, 1]).unwrap();
        let x = a.solve(&b, &dispatcher).unwrap();
        assert_eq!(x.dims(), &[2, 1]);
        let x = x.to_vec::<f64>().unwrap();
        approx::assert_relative_eq!(x[0], 2.0, epsilon = 1e-12);
        approx::assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_matmul() {
        let dispatcher = MatmulDispatcher::new();
        let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], [2, 2]).unwrap();
        let b = Tensor::from_vec(vec![5.0f32, 6.0, 7.0, 8.0], [2, 2]).unwrap();
        let c = a.matmul(&b, &dispatcher).unwrap();
        assert_eq!(c.dims(), &[2, 2]);
        assert_eq!(c.as_slice::<f32>().unwrap(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let dispatcher = MatmulDispatcher::new();
        let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0], [1, 3]).unwrap();
        let b = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], [2, 2]).unwrap();
        assert!(a.matmul(&b, &dispatcher).is_err());
    }
}
