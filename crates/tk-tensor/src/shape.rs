use std::fmt;

use crate::error::{Result, TensorError};

/// A tensor shape, wrapping a vector of dimension sizes.
///
/// An empty shape describes a scalar with one element. Zero-sized
/// dimensions are allowed and give an empty tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// The rank-0 shape.
    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    ///
    /// Tensors only hold shapes that passed [`Shape::checked_numel`], so
    /// this cannot overflow for them.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Like [`Shape::numel`], failing with `ShapeOverflow` when the product
    /// does not fit in `usize`.
    ///
    /// Row-major strides multiply every non-zero dimension, so that product
    /// must fit even when a zero dimension leaves the tensor empty.
    pub fn checked_numel(&self) -> Result<usize> {
        let nonzero = self
            .dims
            .iter()
            .filter(|&&d| d != 0)
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| TensorError::ShapeOverflow(self.dims.clone()))?;
        if self.dims.contains(&0) {
            Ok(0)
        } else {
            Ok(nonzero)
        }
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Computes row-major contiguous strides (in elements) for this shape.
    ///
    /// For a shape [d0, d1, d2], the strides are [d1*d2, d2, 1].
    pub fn strides(&self) -> Vec<usize> {
        if self.dims.is_empty() {
            return vec![];
        }
        let mut strides = vec![0usize; self.dims.len()];
        strides[self.dims.len() - 1] = 1;
        for i in (0..self.dims.len() - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Checks whether `strides` describe a dense row-major layout of this
    /// shape.
    ///
    /// Dimensions of size 1 never advance, so their stride is ignored.
    /// Empty shapes are trivially contiguous.
    pub fn is_contiguous(&self, strides: &[usize]) -> bool {
        if strides.len() != self.dims.len() {
            return false;
        }
        if self.numel() == 0 {
            return true;
        }
        let expected = self.strides();
        self.dims
            .iter()
            .zip(strides.iter().zip(expected.iter()))
            .all(|(&d, (&s, &e))| d == 1 || s == e)
    }

    /// Number of storage elements spanned by a view with these strides,
    /// i.e. one past the largest reachable offset.
    pub fn extent(&self, strides: &[usize]) -> usize {
        if self.numel() == 0 {
            return 0;
        }
        1 + self
            .dims
            .iter()
            .zip(strides.iter())
            .map(|(&d, &s)| (d - 1) * s)
            .sum::<usize>()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}
