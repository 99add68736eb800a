//! Tensor-constructor reference operators.

use shapegen_tensor::Tensor;

use super::{float_output, int_output, to_dims, OpError};
use crate::args::{Value, ValueArg};
use crate::ops::elementwise::ones_like;

/// Constructors taking an explicit size as their first argument
/// (`zeros`, `ones`, `empty`).
pub(crate) fn from_size(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let size = args[0].ints()?;
    Ok(vec![float_output(to_dims(&size)?)])
}

pub(crate) fn full(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let size = args[0].ints()?;
    let fill_value = args[1].float()?;
    Ok(vec![Value::Float(Tensor::full(to_dims(&size)?, fill_value as f32))])
}

/// Constructors producing a tensor shaped like their first argument
/// (`zeros_like`, `full_like`, `bernoulli`, ...).
pub(crate) fn like(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    Ok(vec![ones_like(input)])
}

/// Constructors taking a tensor for its options and an explicit size
/// (`new_zeros`, `new_ones`).
pub(crate) fn new_from_size(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    args[0].tensor()?;
    let size = args[1].ints()?;
    Ok(vec![float_output(to_dims(&size)?)])
}

/// `arange` in its three overloads, distinguished by argument count:
/// `(end)`, `(start, end)` and `(start, end, step)`, each followed by a
/// dtype argument.
pub(crate) fn arange(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let (start, end, step) = match args.len() {
        2 => (0., args[0].float()?, 1.),
        3 => (args[0].float()?, args[1].float()?, 1.),
        4 => (args[0].float()?, args[1].float()?, args[2].float()?),
        _ => return Err(OpError::InputType("unexpected number of arguments")),
    };
    if step == 0. {
        return Err(OpError::InvalidValue("step must be nonzero"));
    }
    if (step > 0. && end < start) || (step < 0. && end > start) {
        return Err(OpError::InvalidValue(
            "upper bound and lower bound inconsistent with step sign",
        ));
    }
    let len = ((end - start) / step).ceil() as usize;
    Ok(vec![float_output(vec![len])])
}

pub(crate) fn bincount(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let Some(input) = input.as_int() else {
        return Err(OpError::InputType("bincount expects an integer tensor"));
    };
    if input.ndim() != 1 {
        return Err(OpError::IncompatibleInputShapes("bincount expects a 1-D tensor"));
    }
    let minlength = args[2].int()?;
    if minlength < 0 {
        return Err(OpError::InvalidValue("minlength must be non-negative"));
    }
    let mut len = minlength as usize;
    for &value in input.data() {
        if value < 0 {
            return Err(OpError::InvalidValue("bincount only supports non-negative values"));
        }
        len = len.max(value as usize + 1);
    }
    let weights = args[1].opt_tensor()?;
    if let Some(weights) = weights {
        if weights.shape() != input.shape() {
            return Err(OpError::IncompatibleInputShapes(
                "weights must have the same shape as the input",
            ));
        }
        return Ok(vec![float_output(vec![len])]);
    }
    Ok(vec![int_output(vec![len])])
}

/// `prim::NumToTensor`: wrap a scalar into a 0-D tensor.
pub(crate) fn num_to_tensor(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let value = args[0].float()?;
    Ok(vec![Value::Float(Tensor::from_scalar(value as f32))])
}
