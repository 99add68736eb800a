//! Layout and shape-manipulation reference operators.

use shapegen_tensor::Tensor;

use super::{float_output, to_dims, wrap_dim, OpError};
use crate::args::{Value, ValueArg};

fn with_shape(input: &Value, shape: Vec<usize>) -> Value {
    match input {
        Value::Float(_) => Value::Float(Tensor::<f32>::ones(shape)),
        Value::Int(_) => Value::Int(Tensor::<i64>::ones(shape)),
    }
}

pub(crate) fn t(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let shape = match input.shape() {
        [] => Vec::new(),
        [n] => vec![*n],
        [rows, cols] => vec![*cols, *rows],
        _ => {
            return Err(OpError::IncompatibleInputShapes(
                "t() expects a tensor with at most 2 dimensions",
            ))
        }
    };
    Ok(vec![with_shape(input, shape)])
}

pub(crate) fn transpose(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let dim0 = wrap_dim(args[1].int()?, input.ndim())?;
    let dim1 = wrap_dim(args[2].int()?, input.ndim())?;
    let mut shape = input.shape().to_vec();
    shape.swap(dim0, dim1);
    Ok(vec![with_shape(input, shape)])
}

pub(crate) fn permute(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let dims = args[1].ints()?;
    if dims.len() != input.ndim() {
        return Err(OpError::IncompatibleInputShapes(
            "permute dims must match the input dimension count",
        ));
    }
    let mut seen = vec![false; input.ndim()];
    let mut shape = Vec::with_capacity(input.ndim());
    for &dim in &dims {
        let dim = wrap_dim(dim, input.ndim())?;
        if seen[dim] {
            return Err(OpError::InvalidValue("repeated dim in permute"));
        }
        seen[dim] = true;
        shape.push(input.shape()[dim]);
    }
    Ok(vec![with_shape(input, shape)])
}

pub(crate) fn unsqueeze(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let dim = wrap_dim(args[1].int()?, input.ndim() + 1)?;
    let mut shape = input.shape().to_vec();
    shape.insert(dim, 1);
    Ok(vec![with_shape(input, shape)])
}

/// `squeeze`: remove every size-1 dimension, or one dimension when called
/// through the `dim` overload.
pub(crate) fn squeeze(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let shape = if args.len() == 1 {
        input.shape().iter().copied().filter(|&size| size != 1).collect()
    } else {
        let dim = wrap_dim(args[1].int()?, input.ndim())?;
        let mut shape = input.shape().to_vec();
        if !shape.is_empty() && shape[dim] == 1 {
            shape.remove(dim);
        }
        shape
    };
    Ok(vec![with_shape(input, shape)])
}

pub(crate) fn flatten(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let start = wrap_dim(args[1].int()?, input.ndim())?;
    let end = wrap_dim(args[2].int()?, input.ndim())?;
    if start > end {
        return Err(OpError::InvalidValue("flatten start_dim cannot come after end_dim"));
    }
    if input.ndim() == 0 {
        return Ok(vec![with_shape(input, vec![1])]);
    }
    let dims = input.shape();
    let mut shape = dims[..start].to_vec();
    shape.push(dims[start..=end].iter().product());
    shape.extend_from_slice(&dims[end + 1..]);
    Ok(vec![with_shape(input, shape)])
}

pub(crate) fn view(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let size = args[1].ints()?;
    let numel = input.shape().iter().product::<usize>() as i64;
    let mut inferred = None;
    let mut known: i64 = 1;
    for (i, &s) in size.iter().enumerate() {
        if s == -1 {
            if inferred.is_some() {
                return Err(OpError::InvalidValue("only one dimension can be inferred"));
            }
            inferred = Some(i);
        } else if s < 0 {
            return Err(OpError::InvalidValue("invalid shape dimension"));
        } else {
            known *= s;
        }
    }
    let mut out = size.clone();
    if let Some(i) = inferred {
        if known == 0 || numel % known != 0 {
            return Err(OpError::IncompatibleInputShapes("shape is invalid for input size"));
        }
        out[i] = numel / known;
    } else if known != numel {
        return Err(OpError::IncompatibleInputShapes("shape is invalid for input size"));
    }
    Ok(vec![with_shape(input, to_dims(&out)?)])
}

pub(crate) fn expand(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let size = args[1].ints()?;
    let dims = input.shape();
    if size.len() < dims.len() {
        return Err(OpError::IncompatibleInputShapes(
            "expanded size must have at least as many dimensions as the input",
        ));
    }
    let offset = size.len() - dims.len();
    let mut shape = Vec::with_capacity(size.len());
    for i in 0..size.len() {
        if i < offset {
            if size[i] < 0 {
                return Err(OpError::InvalidValue(
                    "expanded size -1 is not allowed in a leading dimension",
                ));
            }
            shape.push(size[i] as usize);
        } else {
            let existing = dims[i - offset];
            let target = size[i];
            if target == -1 || target == existing as i64 {
                shape.push(existing);
            } else if existing == 1 && target >= 0 {
                shape.push(target as usize);
            } else {
                return Err(OpError::IncompatibleInputShapes(
                    "expanded size must match the existing size",
                ));
            }
        }
    }
    Ok(vec![with_shape(input, shape)])
}

/// `_shape_as_tensor`: a 1-D integer tensor holding the input's dimension
/// sizes.
pub(crate) fn shape_as_tensor(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let dims: Vec<i64> = input.shape().iter().map(|&size| size as i64).collect();
    Ok(vec![Value::Int(Tensor::from_data(vec![dims.len()], dims))])
}

pub(crate) fn cat(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let tensors = args[0].tensors()?;
    let dim = args[1].int()?;
    if tensors.is_empty() {
        return Err(OpError::InvalidValue("expected a non-empty list of tensors"));
    }
    // 1-D empty tensors are legacy placeholders which concatenate with
    // anything.
    let non_empty: Vec<&Value> = tensors
        .iter()
        .copied()
        .filter(|tensor| tensor.shape() != [0])
        .collect();
    let Some(&first) = non_empty.first() else {
        return Ok(vec![float_output(vec![0])]);
    };
    let first_shape = first.shape();
    if first_shape.is_empty() {
        return Err(OpError::IncompatibleInputShapes(
            "zero-dimensional tensors cannot be concatenated",
        ));
    }
    let dim = wrap_dim(dim, first_shape.len())?;
    let mut shape = first_shape.to_vec();
    shape[dim] = 0;
    for tensor in &non_empty {
        let tensor_shape = tensor.shape();
        if tensor_shape.len() != first_shape.len() {
            return Err(OpError::IncompatibleInputShapes(
                "tensors must have the same number of dimensions",
            ));
        }
        for i in 0..tensor_shape.len() {
            if i != dim && tensor_shape[i] != first_shape[i] {
                return Err(OpError::IncompatibleInputShapes(
                    "sizes of tensors must match except in the concatenated dimension",
                ));
            }
        }
        shape[dim] += tensor_shape[dim];
    }
    Ok(vec![with_shape(first, shape)])
}

pub(crate) fn constant_pad_nd(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let pad = args[1].ints()?;
    if pad.len() % 2 != 0 {
        return Err(OpError::InvalidValue("pad length must be divisible by 2"));
    }
    if pad.len() / 2 > input.ndim() {
        return Err(OpError::IncompatibleInputShapes(
            "pad dimensions must not exceed the input dimensions",
        ));
    }
    let mut shape: Vec<i64> = input.shape().iter().map(|&size| size as i64).collect();
    let ndim = shape.len();
    for i in 0..pad.len() / 2 {
        shape[ndim - 1 - i] += pad[2 * i] + pad[2 * i + 1];
    }
    Ok(vec![with_shape(input, to_dims(&shape)?)])
}

#[cfg(test)]
mod tests {
    use super::{cat, constant_pad_nd, expand, flatten, shape_as_tensor, squeeze, view};
    use crate::args::{Arg, TensorOfShape, Value, ValueArg};

    fn tensor_arg(shape: &[usize]) -> ValueArg {
        Arg::Tensor(TensorOfShape::new(shape)).to_value_arg()
    }

    #[test]
    fn test_view_infers_dimension() {
        let out = view(&[tensor_arg(&[2, 3, 4]), ValueArg::Ints(vec![-1, 4])]).unwrap();
        assert_eq!(out[0].shape(), &[6, 4]);
        assert!(view(&[tensor_arg(&[2, 3, 4]), ValueArg::Ints(vec![5, 5])]).is_err());
    }

    #[test]
    fn test_squeeze_overloads() {
        let out = squeeze(&[tensor_arg(&[1, 3, 1])]).unwrap();
        assert_eq!(out[0].shape(), &[3]);

        let out = squeeze(&[tensor_arg(&[1, 3]), ValueArg::Int(0)]).unwrap();
        assert_eq!(out[0].shape(), &[3]);

        let out = squeeze(&[tensor_arg(&[2, 3]), ValueArg::Int(0)]).unwrap();
        assert_eq!(out[0].shape(), &[2, 3]);
    }

    #[test]
    fn test_flatten_rejects_inverted_range() {
        let out = flatten(&[tensor_arg(&[2, 3, 4]), ValueArg::Int(1), ValueArg::Int(-1)]).unwrap();
        assert_eq!(out[0].shape(), &[2, 12]);
        assert!(flatten(&[tensor_arg(&[2, 3, 4]), ValueArg::Int(2), ValueArg::Int(1)]).is_err());
    }

    #[test]
    fn test_expand() {
        let out = expand(&[tensor_arg(&[1, 3]), ValueArg::Ints(vec![4, 3])]).unwrap();
        assert_eq!(out[0].shape(), &[4, 3]);
        assert!(expand(&[tensor_arg(&[2, 3]), ValueArg::Ints(vec![4, 3])]).is_err());
    }

    #[test]
    fn test_shape_as_tensor_holds_real_sizes() {
        let out = shape_as_tensor(&[tensor_arg(&[2, 3])]).unwrap();
        let Value::Int(tensor) = &out[0] else {
            panic!("expected an integer tensor");
        };
        assert_eq!(tensor.shape(), &[2]);
        assert_eq!(tensor.data(), &[2, 3]);
    }

    #[test]
    fn test_cat() {
        let tensors = ValueArg::List(vec![tensor_arg(&[2, 3]), tensor_arg(&[4, 3])]);
        let out = cat(&[tensors, ValueArg::Int(0)]).unwrap();
        assert_eq!(out[0].shape(), &[6, 3]);

        let with_legacy_empty = ValueArg::List(vec![tensor_arg(&[2, 3]), tensor_arg(&[0])]);
        let out = cat(&[with_legacy_empty, ValueArg::Int(0)]).unwrap();
        assert_eq!(out[0].shape(), &[2, 3]);

        let mismatched = ValueArg::List(vec![tensor_arg(&[2, 3]), tensor_arg(&[2, 4])]);
        assert!(cat(&[mismatched, ValueArg::Int(0)]).is_err());
    }

    #[test]
    fn test_constant_pad_nd() {
        let out = constant_pad_nd(&[
            tensor_arg(&[2, 3]),
            ValueArg::Ints(vec![1, 2, 3, 4]),
            ValueArg::Float(0.),
        ])
        .unwrap();
        assert_eq!(out[0].shape(), &[9, 6]);

        assert!(constant_pad_nd(&[
            tensor_arg(&[2]),
            ValueArg::Ints(vec![1]),
            ValueArg::Float(0.),
        ])
        .is_err());
    }
}
