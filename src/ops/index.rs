//! Indexing and gathering reference operators.

use shapegen_tensor::Tensor;

use super::{broadcast_shapes, float_output, wrap_dim, OpError};
use crate::args::{Value, ValueArg};

/// Check that every element of an integer index tensor is a valid index
/// into a dimension of size `size`.
fn check_index_values(index: &Tensor<i64>, size: usize) -> Result<(), OpError> {
    for &value in index.data() {
        if value < 0 || value as usize >= size {
            return Err(OpError::InvalidValue("index out of bounds"));
        }
    }
    Ok(())
}

fn int_index(value: &Value) -> Result<&Tensor<i64>, OpError> {
    value
        .as_int()
        .ok_or(OpError::InputType("expected an integer index tensor"))
}

pub(crate) fn slice(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    if input.ndim() == 0 {
        return Err(OpError::IncompatibleInputShapes(
            "slice() cannot be applied to a 0-dim tensor",
        ));
    }
    let dim = wrap_dim(args[1].int()?, input.ndim())?;
    let step = args[4].int()?;
    if step <= 0 {
        return Err(OpError::InvalidValue("slice step must be positive"));
    }
    let size = input.shape()[dim] as i64;
    let mut start = args[2].opt_int()?.unwrap_or(0);
    let mut end = args[3].opt_int()?.unwrap_or(i64::MAX);
    if start < 0 {
        start += size;
    }
    if end < 0 {
        end += size;
    }
    let start = start.clamp(0, size);
    let end = end.clamp(start, size);
    let mut shape = input.shape().to_vec();
    shape[dim] = ((end - start + step - 1) / step) as usize;
    Ok(vec![float_output(shape)])
}

pub(crate) fn select(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    if input.ndim() == 0 {
        return Err(OpError::IncompatibleInputShapes(
            "select() cannot be applied to a 0-dim tensor",
        ));
    }
    let dim = wrap_dim(args[1].int()?, input.ndim())?;
    let index = args[2].int()?;
    let size = input.shape()[dim] as i64;
    if index < -size || index >= size {
        return Err(OpError::InvalidValue("select index out of range"));
    }
    let mut shape = input.shape().to_vec();
    shape.remove(dim);
    Ok(vec![float_output(shape)])
}

pub(crate) fn index_select(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let dim = wrap_dim(args[1].int()?, input.ndim())?;
    let index = int_index(args[2].tensor()?)?;
    if index.ndim() > 1 {
        return Err(OpError::IncompatibleInputShapes("index_select index must be 0-D or 1-D"));
    }
    if !input.shape().is_empty() {
        check_index_values(index, input.shape()[dim])?;
    }
    let mut shape = input.shape().to_vec();
    if !shape.is_empty() {
        shape[dim] = index.len();
    }
    Ok(vec![float_output(shape)])
}

pub(crate) fn gather(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let dim = wrap_dim(args[1].int()?, input.ndim())?;
    let index = int_index(args[2].tensor()?)?;
    if index.ndim() != input.ndim() {
        return Err(OpError::IncompatibleInputShapes(
            "gather index must have the same number of dimensions as the input",
        ));
    }
    for d in 0..index.ndim() {
        if d != dim && index.shape()[d] > input.shape()[d] {
            return Err(OpError::IncompatibleInputShapes(
                "gather index size must not exceed the input size",
            ));
        }
    }
    if !input.shape().is_empty() {
        check_index_values(index, input.shape()[dim])?;
    }
    Ok(vec![float_output(index.shape().to_vec())])
}

pub(crate) fn embedding(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let weight = args[0].tensor()?;
    let indices = int_index(args[1].tensor()?)?;
    if weight.ndim() != 2 {
        return Err(OpError::IncompatibleInputShapes("embedding weight must be 2-D"));
    }
    check_index_values(indices, weight.shape()[0])?;
    let mut shape = indices.shape().to_vec();
    shape.push(weight.shape()[1]);
    Ok(vec![float_output(shape)])
}

/// Advanced indexing (`aten::index`): index tensors broadcast together and
/// replace the indexed dimensions; entries equal to null leave their
/// dimension untouched.
pub(crate) fn index(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let indices = args[1].opt_tensors()?;
    if indices.len() > input.ndim() {
        return Err(OpError::IncompatibleInputShapes("too many indices for tensor"));
    }
    let mut broadcasted: Vec<usize> = Vec::new();
    for (dim, entry) in indices.iter().enumerate() {
        let Some(entry) = *entry else {
            continue;
        };
        let entry = int_index(entry)?;
        check_index_values(entry, input.shape()[dim])?;
        broadcasted = broadcast_shapes(&broadcasted, entry.shape())?;
    }
    let mut shape = broadcasted;
    for (dim, &size) in input.shape().iter().enumerate() {
        let indexed = indices.get(dim).map(|entry| entry.is_some()).unwrap_or(false);
        if !indexed {
            shape.push(size);
        }
    }
    Ok(vec![float_output(shape)])
}

#[cfg(test)]
mod tests {
    use super::{embedding, gather, index, index_select, slice};
    use crate::args::{long_tensor, Arg, TensorOfShape, ValueArg};

    fn tensor_arg(shape: &[usize]) -> ValueArg {
        Arg::Tensor(TensorOfShape::new(shape)).to_value_arg()
    }

    fn index_arg(shape: &[usize]) -> ValueArg {
        Arg::Tensor(long_tensor(shape)).to_value_arg()
    }

    #[test]
    fn test_slice() {
        let out = slice(&[
            tensor_arg(&[10]),
            ValueArg::Int(0),
            ValueArg::Int(2),
            ValueArg::Int(8),
            ValueArg::Int(2),
        ])
        .unwrap();
        assert_eq!(out[0].shape(), &[3]);

        assert!(slice(&[
            tensor_arg(&[10]),
            ValueArg::Int(0),
            ValueArg::None,
            ValueArg::None,
            ValueArg::Int(0),
        ])
        .is_err());
    }

    #[test]
    fn test_index_select_checks_index_values() {
        let out = index_select(&[tensor_arg(&[2, 3]), ValueArg::Int(0), index_arg(&[4])]).unwrap();
        assert_eq!(out[0].shape(), &[4, 3]);

        // The canonical index value is 1, which is out of bounds for a
        // size-1 dimension.
        assert!(index_select(&[tensor_arg(&[1, 3]), ValueArg::Int(0), index_arg(&[4])]).is_err());

        // Float index tensors are rejected.
        assert!(index_select(&[tensor_arg(&[2, 3]), ValueArg::Int(0), tensor_arg(&[4])]).is_err());
    }

    #[test]
    fn test_gather_requires_matching_rank() {
        let out = gather(&[
            tensor_arg(&[2, 3]),
            ValueArg::Int(1),
            index_arg(&[2, 3]),
            ValueArg::Bool(false),
        ])
        .unwrap();
        assert_eq!(out[0].shape(), &[2, 3]);

        assert!(gather(&[
            tensor_arg(&[2, 3]),
            ValueArg::Int(1),
            index_arg(&[2]),
            ValueArg::Bool(false),
        ])
        .is_err());
    }

    #[test]
    fn test_embedding() {
        let out = embedding(&[
            tensor_arg(&[10, 4]),
            index_arg(&[2, 3]),
            ValueArg::Int(-1),
            ValueArg::Bool(false),
            ValueArg::Bool(false),
        ])
        .unwrap();
        assert_eq!(out[0].shape(), &[2, 3, 4]);
    }

    #[test]
    fn test_index_appends_unindexed_dims() {
        let indices = ValueArg::List(vec![index_arg(&[4])]);
        let out = index(&[tensor_arg(&[2, 3]), indices]).unwrap();
        assert_eq!(out[0].shape(), &[4, 3]);

        let indices = ValueArg::List(vec![index_arg(&[4, 5, 6]), index_arg(&[1, 5, 1])]);
        let out = index(&[tensor_arg(&[2, 3]), indices]).unwrap();
        assert_eq!(out[0].shape(), &[4, 5, 6]);

        let too_many = ValueArg::List(vec![index_arg(&[4]), index_arg(&[4]), index_arg(&[4])]);
        assert!(index(&[tensor_arg(&[2, 3]), too_many]).is_err());
    }
}
