//! Reduction reference operators.

use smallvec::SmallVec;

use super::{float_output, int_output, wrap_dim, OpError};
use crate::args::{Value, ValueArg};

fn reduced_shape(shape: &[usize], dims: &[i64], keep_dims: bool) -> Result<Vec<usize>, OpError> {
    if dims.is_empty() {
        return Ok(if keep_dims {
            vec![1; shape.len()]
        } else {
            Vec::new()
        });
    }
    let mut axes: SmallVec<[usize; 4]> = SmallVec::with_capacity(dims.len());
    for &dim in dims {
        axes.push(wrap_dim(dim, shape.len())?);
    }
    axes.sort_unstable();
    axes.dedup();
    let mut out = Vec::with_capacity(shape.len());
    for (i, &size) in shape.iter().enumerate() {
        if axes.contains(&i) {
            if keep_dims {
                out.push(1);
            }
        } else {
            out.push(size);
        }
    }
    Ok(out)
}

/// `sum`/`mean`: reduce everything, or reduce a dimension list when called
/// through the `dim` overload.
pub(crate) fn full_or_dim_reduce(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    if args.len() == 2 {
        return Ok(vec![float_output(Vec::new())]);
    }
    let dims = args[1].ints()?;
    let keep_dims = args[2].boolean()?;
    Ok(vec![float_output(reduced_shape(input.shape(), &dims, keep_dims)?)])
}

/// Reductions that always collapse to a scalar (`var` and friends).
pub(crate) fn full_reduce(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    args[0].tensor()?;
    Ok(vec![float_output(Vec::new())])
}

/// `max`: scalar reduction, or per-dimension values/indices pair when
/// called through the `dim` overload.
pub(crate) fn max(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    if args.len() == 1 {
        return Ok(vec![float_output(Vec::new())]);
    }
    let dim = args[1].int()?;
    let keep_dims = args[2].boolean()?;
    let shape = reduced_shape(input.shape(), &[dim], keep_dims)?;
    Ok(vec![float_output(shape.clone()), int_output(shape)])
}

pub(crate) fn any_dim(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let dim = args[1].int()?;
    let keep_dims = args[2].boolean()?;
    Ok(vec![int_output(reduced_shape(input.shape(), &[dim], keep_dims)?)])
}

pub(crate) fn argmax(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let Some(dim) = args[1].opt_int()? else {
        return Ok(vec![int_output(Vec::new())]);
    };
    let keep_dims = args[2].boolean()?;
    Ok(vec![int_output(reduced_shape(input.shape(), &[dim], keep_dims)?)])
}

pub(crate) fn topk(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let k = args[1].int()?;
    let dim = wrap_dim(args[2].int()?, input.ndim())?;
    if input.ndim() == 0 {
        return Err(OpError::IncompatibleInputShapes("topk expects at least a 1-D tensor"));
    }
    let size = input.shape()[dim];
    if k < 0 || k as usize > size {
        return Err(OpError::InvalidValue("selected index k out of range"));
    }
    let mut shape = input.shape().to_vec();
    shape[dim] = k as usize;
    Ok(vec![float_output(shape.clone()), int_output(shape)])
}
