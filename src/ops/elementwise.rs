//! Elementwise reference operators.

use shapegen_tensor::Tensor;

use super::{broadcast_shapes, float_output, int_output, wrap_dim, OpError};
use crate::args::{Value, ValueArg};

/// Materialize an output matching the shape and element type of `value`.
pub(crate) fn ones_like(value: &Value) -> Value {
    match value {
        Value::Float(tensor) => Value::Float(Tensor::<f32>::ones(tensor.shape().to_vec())),
        Value::Int(tensor) => Value::Int(Tensor::<i64>::ones(tensor.shape().to_vec())),
    }
}

/// Elementwise operators whose output matches the first input. Extra
/// arguments (clip bounds, scalar operands and so on) do not affect the
/// shape.
pub(crate) fn unary(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    Ok(vec![ones_like(input)])
}

pub(crate) fn gelu(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    match args[1].string()? {
        "none" | "tanh" => Ok(vec![ones_like(input)]),
        _ => Err(OpError::InvalidValue("approximate must be \"none\" or \"tanh\"")),
    }
}

pub(crate) fn dropout(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let p = args[1].float()?;
    if !(0. ..=1.).contains(&p) {
        return Err(OpError::InvalidValue("dropout probability must be in [0, 1]"));
    }
    Ok(vec![ones_like(input)])
}

/// Softmax-style operators: same shape as the input, with the reduction
/// dimension bounds-checked.
pub(crate) fn softmax(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    wrap_dim(args[1].int()?, input.ndim())?;
    Ok(vec![float_output(input.shape().to_vec())])
}

/// Binary arithmetic operators. The second operand is either a tensor,
/// in which case the operands broadcast together, or a scalar.
pub(crate) fn binary(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let lhs = args[0].tensor()?;
    match &args[1] {
        ValueArg::Tensor(rhs) => {
            let shape = broadcast_shapes(lhs.shape(), rhs.shape())?;
            Ok(vec![float_output(shape)])
        }
        _ => {
            args[1].float()?;
            Ok(vec![ones_like(lhs)])
        }
    }
}

/// Comparison operators: like [`binary`] but producing a boolean-valued
/// (integer) tensor.
pub(crate) fn compare(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let lhs = args[0].tensor()?;
    match &args[1] {
        ValueArg::Tensor(rhs) => {
            let shape = broadcast_shapes(lhs.shape(), rhs.shape())?;
            Ok(vec![int_output(shape)])
        }
        _ => {
            args[1].float()?;
            Ok(vec![int_output(lhs.shape().to_vec())])
        }
    }
}

/// `where(condition, self, other)`: all three operands broadcast together.
pub(crate) fn where_self(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let condition = args[0].tensor()?;
    let lhs = args[1].tensor()?;
    let rhs = args[2].tensor()?;
    let shape = broadcast_shapes(condition.shape(), &broadcast_shapes(lhs.shape(), rhs.shape())?)?;
    Ok(vec![float_output(shape)])
}

/// Three-tensor elementwise operators (`lerp`, `addcmul`, `addcdiv`): the
/// first three arguments broadcast together.
pub(crate) fn ternary_broadcast(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let a = args[0].tensor()?;
    let b = args[1].tensor()?;
    let c = args[2].tensor()?;
    let shape = broadcast_shapes(a.shape(), &broadcast_shapes(b.shape(), c.shape())?)?;
    Ok(vec![float_output(shape)])
}

#[cfg(test)]
mod tests {
    use super::{binary, compare, softmax, unary, where_self};
    use crate::args::{Arg, TensorOfShape};

    fn tensor_arg(shape: &[usize]) -> crate::args::ValueArg {
        Arg::Tensor(TensorOfShape::new(shape)).to_value_arg()
    }

    #[test]
    fn test_unary_preserves_shape() {
        let out = unary(&[tensor_arg(&[2, 3])]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].shape(), &[2, 3]);
    }

    #[test]
    fn test_binary_broadcasts() {
        let out = binary(&[tensor_arg(&[2, 3]), tensor_arg(&[3])]).unwrap();
        assert_eq!(out[0].shape(), &[2, 3]);

        assert!(binary(&[tensor_arg(&[2, 3]), tensor_arg(&[4, 3])]).is_err());

        // Scalar operand.
        let out = binary(&[tensor_arg(&[2, 3]), crate::args::ValueArg::Float(2.)]).unwrap();
        assert_eq!(out[0].shape(), &[2, 3]);
    }

    #[test]
    fn test_compare_is_integer_valued() {
        let out = compare(&[tensor_arg(&[2, 3]), tensor_arg(&[2, 3])]).unwrap();
        assert!(out[0].as_int().is_some());
    }

    #[test]
    fn test_softmax_checks_dim() {
        assert!(softmax(&[tensor_arg(&[2, 3]), crate::args::ValueArg::Int(1), crate::args::ValueArg::None]).is_ok());
        assert!(softmax(&[tensor_arg(&[2, 3]), crate::args::ValueArg::Int(2), crate::args::ValueArg::None]).is_err());
    }

    #[test]
    fn test_where_broadcasts_all_three() {
        let out = where_self(&[tensor_arg(&[1, 3]), tensor_arg(&[2, 1]), tensor_arg(&[1])]).unwrap();
        assert_eq!(out[0].shape(), &[2, 3]);
    }
}
