//! Matrix product reference operators.

use super::{broadcast_shapes, float_output, OpError};
use crate::args::{Value, ValueArg};

fn mm_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, OpError> {
    if a.len() != 2 || b.len() != 2 {
        return Err(OpError::IncompatibleInputShapes("mm expects two matrices"));
    }
    if a[1] != b[0] {
        return Err(OpError::IncompatibleInputShapes("mat1 and mat2 shapes cannot be multiplied"));
    }
    Ok(vec![a[0], b[1]])
}

pub(crate) fn mm(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let a = args[0].tensor()?;
    let b = args[1].tensor()?;
    Ok(vec![float_output(mm_shapes(a.shape(), b.shape())?)])
}

pub(crate) fn bmm(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let a = args[0].tensor()?;
    let b = args[1].tensor()?;
    let (a, b) = (a.shape(), b.shape());
    if a.len() != 3 || b.len() != 3 {
        return Err(OpError::IncompatibleInputShapes("bmm expects 3-D tensors"));
    }
    if a[0] != b[0] {
        return Err(OpError::IncompatibleInputShapes("batch dimensions must match"));
    }
    if a[2] != b[1] {
        return Err(OpError::IncompatibleInputShapes("batch1 and batch2 shapes cannot be multiplied"));
    }
    Ok(vec![float_output(vec![a[0], a[1], b[2]])])
}

fn matmul_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, OpError> {
    if a.is_empty() || b.is_empty() {
        return Err(OpError::IncompatibleInputShapes(
            "matmul operands must be at least 1-D",
        ));
    }
    match (a.len(), b.len()) {
        (1, 1) => {
            if a[0] != b[0] {
                return Err(OpError::IncompatibleInputShapes("vector sizes must match"));
            }
            Ok(Vec::new())
        }
        (2, 1) => {
            if a[1] != b[0] {
                return Err(OpError::IncompatibleInputShapes("matrix and vector cannot be multiplied"));
            }
            Ok(vec![a[0]])
        }
        (1, 2) => {
            if a[0] != b[0] {
                return Err(OpError::IncompatibleInputShapes("vector and matrix cannot be multiplied"));
            }
            Ok(vec![b[1]])
        }
        (2, 2) => mm_shapes(a, b),
        _ => {
            let lhs_vector = a.len() == 1;
            let rhs_vector = b.len() == 1;
            let lhs: Vec<usize> = if lhs_vector { vec![1, a[0]] } else { a.to_vec() };
            let rhs: Vec<usize> = if rhs_vector { vec![b[0], 1] } else { b.to_vec() };
            if lhs[lhs.len() - 1] != rhs[rhs.len() - 2] {
                return Err(OpError::IncompatibleInputShapes(
                    "batched operands cannot be multiplied",
                ));
            }
            let mut out = broadcast_shapes(&lhs[..lhs.len() - 2], &rhs[..rhs.len() - 2])?;
            if !lhs_vector {
                out.push(lhs[lhs.len() - 2]);
            }
            if !rhs_vector {
                out.push(rhs[rhs.len() - 1]);
            }
            Ok(out)
        }
    }
}

pub(crate) fn matmul(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let a = args[0].tensor()?;
    let b = args[1].tensor()?;
    Ok(vec![float_output(matmul_shapes(a.shape(), b.shape())?)])
}

pub(crate) fn addmm(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let bias = args[0].tensor()?;
    let mat1 = args[1].tensor()?;
    let mat2 = args[2].tensor()?;
    let product = mm_shapes(mat1.shape(), mat2.shape())?;
    let shape = broadcast_shapes(bias.shape(), &product)?;
    if shape != product {
        return Err(OpError::IncompatibleInputShapes(
            "bias cannot be broadcast to the matrix product",
        ));
    }
    Ok(vec![float_output(shape)])
}

pub(crate) fn linear(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let weight = args[1].tensor()?;
    if weight.ndim() != 2 {
        return Err(OpError::IncompatibleInputShapes("linear weight must be 2-D"));
    }
    let input_shape = input.shape();
    let (out_features, in_features) = (weight.shape()[0], weight.shape()[1]);
    let Some(&last) = input_shape.last() else {
        return Err(OpError::IncompatibleInputShapes("linear input must be at least 1-D"));
    };
    if last != in_features {
        return Err(OpError::IncompatibleInputShapes(
            "input features do not match weight features",
        ));
    }
    let mut out = input_shape[..input_shape.len() - 1].to_vec();
    out.push(out_features);
    if let Some(bias) = args[2].opt_tensor()? {
        if broadcast_shapes(bias.shape(), &out)? != out {
            return Err(OpError::IncompatibleInputShapes("bias cannot be broadcast to the output"));
        }
    }
    Ok(vec![float_output(out)])
}

#[cfg(test)]
mod tests {
    use shapegen_testing::TestCases;

    use super::{bmm, matmul};
    use crate::args::{Arg, TensorOfShape, ValueArg};

    fn tensor_arg(shape: &[usize]) -> ValueArg {
        Arg::Tensor(TensorOfShape::new(shape)).to_value_arg()
    }

    #[test]
    fn test_matmul_shapes() {
        #[derive(Debug)]
        struct Case {
            a: Vec<usize>,
            b: Vec<usize>,
            expected: Option<Vec<usize>>,
        }

        let cases = [
            Case {
                a: vec![3],
                b: vec![3],
                expected: Some(vec![]),
            },
            Case {
                a: vec![2, 3],
                b: vec![3],
                expected: Some(vec![2]),
            },
            Case {
                a: vec![2, 3, 4],
                b: vec![2, 4, 5],
                expected: Some(vec![2, 3, 5]),
            },
            Case {
                a: vec![5, 2, 3],
                b: vec![3, 4],
                expected: Some(vec![5, 2, 4]),
            },
            Case {
                a: vec![2, 3],
                b: vec![4, 5],
                expected: None,
            },
        ];

        cases.test_each(|case| {
            let result = matmul(&[tensor_arg(&case.a), tensor_arg(&case.b)]);
            match &case.expected {
                Some(shape) => {
                    assert_eq!(result.unwrap()[0].shape(), shape.as_slice());
                }
                None => assert!(result.is_err()),
            }
        });
    }

    #[test]
    fn test_bmm_validates_ranks_and_batches() {
        let out = bmm(&[tensor_arg(&[2, 3, 4]), tensor_arg(&[2, 4, 5])]).unwrap();
        assert_eq!(out[0].shape(), &[2, 3, 5]);

        assert!(bmm(&[tensor_arg(&[2, 3, 7]), tensor_arg(&[2, 4, 5])]).is_err());
        assert!(bmm(&[tensor_arg(&[7, 3, 4]), tensor_arg(&[2, 4, 5])]).is_err());
        assert!(bmm(&[tensor_arg(&[7, 3]), tensor_arg(&[2, 4, 5])]).is_err());
    }
}
