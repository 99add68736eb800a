//! Dense row-major tensors for the shapegen reference operators.
//!
//! The reference operators only need to materialize small tensors with a
//! canonical fill value, read their shapes back and occasionally inspect
//! element values, so this crate provides a deliberately small tensor type:
//! owned storage, contiguous row-major layout, no views and no strides.

use std::fmt;

/// Multi-dimensional array with owned, contiguous, row-major storage.
///
/// The element count of a tensor is the product of its dimension sizes. A
/// tensor with zero dimensions is a scalar holding exactly one element.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

/// Compute the number of elements implied by `shape`.
fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

impl<T> Tensor<T> {
    /// Create a tensor from a shape and a data vector.
    ///
    /// Panics if the data length does not match the element count implied by
    /// the shape. This is a programming-error check, not input validation;
    /// callers validate shapes before constructing tensors.
    pub fn from_data(shape: Vec<usize>, data: Vec<T>) -> Tensor<T> {
        assert_eq!(
            data.len(),
            element_count(&shape),
            "data length {} does not match shape {:?}",
            data.len(),
            shape,
        );
        Tensor { shape, data }
    }

    /// Create a zero-dimensional tensor holding a single value.
    pub fn from_scalar(value: T) -> Tensor<T> {
        Tensor {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Return the dimension sizes of this tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Return the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Return the number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Return true if this tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the elements in row-major order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Return the single element of a scalar tensor, or `None` if this
    /// tensor is not a scalar.
    pub fn item(&self) -> Option<&T> {
        if self.shape.is_empty() {
            self.data.first()
        } else {
            None
        }
    }

    /// Return the element at `index`, or `None` if the index has the wrong
    /// rank or is out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() {
            return None;
        }
        // Row-major: the last index varies fastest.
        let mut offset = 0;
        for (&idx, &size) in index.iter().zip(&self.shape) {
            if idx >= size {
                return None;
            }
            offset = offset * size + idx;
        }
        self.data.get(offset)
    }

    /// Apply `f` to every element, producing a tensor of the same shape.
    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> Tensor<U> {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Tensor<T> {
    /// Create a tensor of the given shape with every element set to `value`.
    pub fn full(shape: Vec<usize>, value: T) -> Tensor<T> {
        let len = element_count(&shape);
        Tensor {
            shape,
            data: vec![value; len],
        }
    }
}

impl Tensor<f32> {
    /// Create a float tensor filled with ones.
    pub fn ones(shape: Vec<usize>) -> Tensor<f32> {
        Tensor::full(shape, 1.)
    }

    /// Create a float tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Tensor<f32> {
        Tensor::full(shape, 0.)
    }
}

impl Tensor<i64> {
    /// Create an integer tensor filled with ones.
    pub fn ones(shape: Vec<usize>) -> Tensor<i64> {
        Tensor::full(shape, 1)
    }

    /// Create an integer tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Tensor<i64> {
        Tensor::full(shape, 0)
    }
}

impl<T: fmt::Display> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tensor(shape={:?})", self.shape)
    }
}

#[cfg(test)]
mod tests {
    use shapegen_testing::TestCases;

    use super::Tensor;

    #[test]
    fn test_from_data() {
        let tensor = Tensor::from_data(vec![2, 3], vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor.ndim(), 2);
        assert_eq!(tensor.len(), 6);
        assert_eq!(tensor.get(&[1, 2]), Some(&5));
        assert_eq!(tensor.get(&[0, 0]), Some(&0));
        assert_eq!(tensor.get(&[2, 0]), None);
        assert_eq!(tensor.get(&[0]), None);
    }

    #[test]
    #[should_panic(expected = "does not match shape")]
    fn test_from_data_length_mismatch() {
        Tensor::from_data(vec![2, 3], vec![1, 2]);
    }

    #[test]
    fn test_scalar() {
        let scalar = Tensor::from_scalar(42);
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(scalar.len(), 1);
        assert_eq!(scalar.item(), Some(&42));

        let vector = Tensor::from_data(vec![1], vec![42]);
        assert_eq!(vector.item(), None);
    }

    #[test]
    fn test_full_and_ones() {
        #[derive(Debug)]
        struct Case {
            shape: Vec<usize>,
            expected_len: usize,
        }

        let cases = [
            Case {
                shape: vec![2, 3],
                expected_len: 6,
            },
            Case {
                shape: vec![],
                expected_len: 1,
            },
            Case {
                shape: vec![0, 4],
                expected_len: 0,
            },
        ];

        cases.test_each(|case| {
            let tensor = Tensor::<f32>::ones(case.shape.clone());
            assert_eq!(tensor.shape(), case.shape.as_slice());
            assert_eq!(tensor.len(), case.expected_len);
            assert!(tensor.data().iter().all(|&x| x == 1.));
        });
    }

    #[test]
    fn test_map() {
        let tensor = Tensor::from_data(vec![2, 2], vec![1i64, 2, 3, 4]);
        let doubled = tensor.map(|&x| x * 2);
        assert_eq!(doubled.shape(), &[2, 2]);
        assert_eq!(doubled.data(), &[2, 4, 6, 8]);
    }
}
