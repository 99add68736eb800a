//! Neural-network reference operators.

use super::{float_output, OpError};
use crate::args::{Value, ValueArg};

fn expect_pair(list: &[i64], what: &'static str) -> Result<(i64, i64), OpError> {
    match list {
        [both] => Ok((*both, *both)),
        [first, second] => Ok((*first, *second)),
        _ => Err(OpError::InvalidValue(what)),
    }
}

pub(crate) fn conv2d(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let weight = args[1].tensor()?;
    let bias = args[2].opt_tensor()?;
    let stride = expect_pair(&args[3].ints()?, "stride must have 1 or 2 elements")?;
    let padding = expect_pair(&args[4].ints()?, "padding must have 1 or 2 elements")?;
    let dilation = expect_pair(&args[5].ints()?, "dilation must have 1 or 2 elements")?;
    let groups = args[6].int()?;

    if input.ndim() != 4 || weight.ndim() != 4 {
        return Err(OpError::IncompatibleInputShapes("conv2d expects 4-D input and weight"));
    }
    if groups < 1 {
        return Err(OpError::InvalidValue("groups must be positive"));
    }
    let (in_shape, w_shape) = (input.shape(), weight.shape());
    if in_shape[1] as i64 != w_shape[1] as i64 * groups {
        return Err(OpError::IncompatibleInputShapes(
            "input channels do not match weight channels times groups",
        ));
    }
    if w_shape[0] as i64 % groups != 0 {
        return Err(OpError::IncompatibleInputShapes("output channels must be divisible by groups"));
    }
    if let Some(bias) = bias {
        if bias.shape() != [w_shape[0]] {
            return Err(OpError::IncompatibleInputShapes("bias size must match output channels"));
        }
    }
    let strides = [stride.0, stride.1];
    let paddings = [padding.0, padding.1];
    let dilations = [dilation.0, dilation.1];
    let mut shape = vec![in_shape[0], w_shape[0]];
    for i in 0..2 {
        if strides[i] < 1 {
            return Err(OpError::InvalidValue("stride must be positive"));
        }
        let numerator =
            in_shape[2 + i] as i64 + 2 * paddings[i] - dilations[i] * (w_shape[2 + i] as i64 - 1) - 1;
        if numerator < 0 {
            return Err(OpError::IncompatibleInputShapes("calculated output size is too small"));
        }
        shape.push((numerator / strides[i] + 1) as usize);
    }
    Ok(vec![float_output(shape)])
}

fn pooled_size(
    input: i64,
    kernel: i64,
    stride: i64,
    padding: i64,
    dilation: i64,
    ceil_mode: bool,
) -> Result<i64, OpError> {
    if stride < 1 {
        return Err(OpError::InvalidValue("stride must be positive"));
    }
    if padding * 2 > kernel {
        return Err(OpError::InvalidValue("padding should be at most half of kernel size"));
    }
    let mut numerator = input + 2 * padding - dilation * (kernel - 1) - 1;
    if ceil_mode {
        numerator += stride - 1;
    }
    if numerator < 0 {
        return Err(OpError::IncompatibleInputShapes("calculated output size is too small"));
    }
    let mut out = numerator / stride + 1;
    if ceil_mode && (out - 1) * stride >= input + padding {
        out -= 1;
    }
    if out < 1 {
        return Err(OpError::IncompatibleInputShapes("calculated output size is too small"));
    }
    Ok(out)
}

pub(crate) fn max_pool2d(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let kernel = expect_pair(&args[1].ints()?, "kernel_size must have 1 or 2 elements")?;
    let stride_list = args[2].ints()?;
    let stride = if stride_list.is_empty() {
        kernel
    } else {
        expect_pair(&stride_list, "stride must have 1 or 2 elements")?
    };
    let padding = expect_pair(&args[3].ints()?, "padding must have 1 or 2 elements")?;
    let dilation = expect_pair(&args[4].ints()?, "dilation must have 1 or 2 elements")?;
    let ceil_mode = args[5].boolean()?;

    if input.ndim() != 3 && input.ndim() != 4 {
        return Err(OpError::IncompatibleInputShapes("max_pool2d expects a 3-D or 4-D input"));
    }
    let dims = input.shape();
    let spatial = dims.len() - 2;
    let mut shape = dims[..spatial].to_vec();
    shape.push(pooled_size(dims[spatial] as i64, kernel.0, stride.0, padding.0, dilation.0, ceil_mode)? as usize);
    shape.push(pooled_size(
        dims[spatial + 1] as i64,
        kernel.1,
        stride.1,
        padding.1,
        dilation.1,
        ceil_mode,
    )? as usize);
    Ok(vec![float_output(shape)])
}

pub(crate) fn adaptive_avg_pool2d(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let output_size = args[1].ints()?;
    if input.ndim() != 3 && input.ndim() != 4 {
        return Err(OpError::IncompatibleInputShapes(
            "adaptive_avg_pool2d expects a 3-D or 4-D input",
        ));
    }
    if output_size.len() != 2 {
        return Err(OpError::InvalidValue("output_size must have 2 elements"));
    }
    let mut shape = input.shape()[..input.ndim() - 2].to_vec();
    for &size in &output_size {
        if size < 0 {
            return Err(OpError::InvalidValue("output_size must be non-negative"));
        }
        shape.push(size as usize);
    }
    Ok(vec![float_output(shape)])
}

/// Validate the optional per-channel parameters of a normalization op.
fn check_channel_param(param: Option<&Value>, channels: usize) -> Result<(), OpError> {
    if let Some(param) = param {
        if param.shape() != [channels] {
            return Err(OpError::IncompatibleInputShapes(
                "per-channel parameter size must match the channel count",
            ));
        }
    }
    Ok(())
}

pub(crate) fn batch_norm(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    if input.ndim() < 2 {
        return Err(OpError::IncompatibleInputShapes("batch_norm expects at least a 2-D input"));
    }
    let channels = input.shape()[1];
    check_channel_param(args[1].opt_tensor()?, channels)?;
    check_channel_param(args[2].opt_tensor()?, channels)?;
    check_channel_param(args[3].opt_tensor()?, channels)?;
    check_channel_param(args[4].opt_tensor()?, channels)?;
    Ok(vec![float_output(input.shape().to_vec())])
}

pub(crate) fn native_batch_norm(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    if input.ndim() < 2 {
        return Err(OpError::IncompatibleInputShapes(
            "native_batch_norm expects at least a 2-D input",
        ));
    }
    let channels = input.shape()[1];
    check_channel_param(args[1].opt_tensor()?, channels)?;
    check_channel_param(args[2].opt_tensor()?, channels)?;
    let running_mean = args[3].opt_tensor()?;
    let running_var = args[4].opt_tensor()?;
    check_channel_param(running_mean, channels)?;
    check_channel_param(running_var, channels)?;
    let training = args[5].boolean()?;
    if !training && (running_mean.is_none() || running_var.is_none()) {
        return Err(OpError::InvalidValue("running stats are required in inference mode"));
    }
    // In training mode the saved statistics have one entry per channel; in
    // inference mode they are empty.
    let stats_size = if training { channels } else { 0 };
    Ok(vec![
        float_output(input.shape().to_vec()),
        float_output(vec![stats_size]),
        float_output(vec![stats_size]),
    ])
}

/// Check that `normalized_shape` matches the trailing dimensions of
/// `input`, returning the number of leading (unnormalized) dimensions.
fn check_normalized_shape(input: &[usize], normalized: &[i64]) -> Result<usize, OpError> {
    if normalized.len() > input.len() {
        return Err(OpError::IncompatibleInputShapes(
            "normalized_shape has more dimensions than the input",
        ));
    }
    let leading = input.len() - normalized.len();
    for (i, &size) in normalized.iter().enumerate() {
        if input[leading + i] as i64 != size {
            return Err(OpError::IncompatibleInputShapes(
                "normalized_shape does not match the trailing input dimensions",
            ));
        }
    }
    Ok(leading)
}

pub(crate) fn native_layer_norm(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let normalized = args[1].ints()?;
    let leading = check_normalized_shape(input.shape(), &normalized)?;
    let mut stats_shape = input.shape()[..leading].to_vec();
    stats_shape.extend(std::iter::repeat(1).take(normalized.len()));
    Ok(vec![
        float_output(input.shape().to_vec()),
        float_output(stats_shape.clone()),
        float_output(stats_shape),
    ])
}

pub(crate) fn layer_norm(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let normalized = args[1].ints()?;
    check_normalized_shape(input.shape(), &normalized)?;
    Ok(vec![float_output(input.shape().to_vec())])
}

pub(crate) fn nll_loss_forward(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    let input = args[0].tensor()?;
    let target = args[1].tensor()?;
    let weight = args[2].opt_tensor()?;
    let reduction = args[3].int()?;

    let input_dim = input.ndim();
    let target_dim = target.ndim();
    if input_dim == 0 || input_dim > 2 {
        return Err(OpError::IncompatibleInputShapes("input must be 1-D or 2-D"));
    }
    if target_dim > 1 {
        return Err(OpError::IncompatibleInputShapes("target must be 0-D or 1-D"));
    }
    let no_batch_dim = input_dim == 1 && target_dim == 0;
    if !no_batch_dim && (target_dim == 0 || input.shape()[0] != target.shape()[0]) {
        return Err(OpError::IncompatibleInputShapes(
            "input and target batch sizes do not match",
        ));
    }
    let n_classes = input.shape()[input_dim - 1];
    if let Some(weight) = weight {
        if weight.shape() != [n_classes] {
            return Err(OpError::IncompatibleInputShapes("weight size must match class count"));
        }
    }
    if reduction == 0 && input_dim == 2 {
        Ok(vec![
            float_output(vec![input.shape()[0]]),
            float_output(Vec::new()),
        ])
    } else {
        Ok(vec![float_output(Vec::new()), float_output(Vec::new())])
    }
}

pub(crate) fn nll_loss_backward(args: &[ValueArg]) -> Result<Vec<Value>, OpError> {
    args[0].tensor()?;
    let input = args[1].tensor()?;
    let input_dim = input.ndim();
    if input_dim == 0 || input_dim > 2 {
        return Err(OpError::IncompatibleInputShapes("input must be 1-D or 2-D"));
    }
    Ok(vec![float_output(input.shape().to_vec())])
}

#[cfg(test)]
mod tests {
    use super::{adaptive_avg_pool2d, conv2d, max_pool2d, native_batch_norm, nll_loss_forward};
    use crate::args::{long_tensor, Arg, TensorOfShape, ValueArg};

    fn tensor_arg(shape: &[usize]) -> ValueArg {
        Arg::Tensor(TensorOfShape::new(shape)).to_value_arg()
    }

    fn index_arg(shape: &[usize]) -> ValueArg {
        Arg::Tensor(long_tensor(shape)).to_value_arg()
    }

    #[test]
    fn test_conv2d() {
        let out = conv2d(&[
            tensor_arg(&[1, 3, 8, 8]),
            tensor_arg(&[16, 3, 1, 1]),
            ValueArg::None,
            ValueArg::Ints(vec![1, 1]),
            ValueArg::Ints(vec![0, 0]),
            ValueArg::Ints(vec![1, 1]),
            ValueArg::Int(1),
        ])
        .unwrap();
        assert_eq!(out[0].shape(), &[1, 16, 8, 8]);

        // Channel mismatch.
        assert!(conv2d(&[
            tensor_arg(&[1, 4, 8, 8]),
            tensor_arg(&[16, 3, 1, 1]),
            ValueArg::None,
            ValueArg::Ints(vec![1, 1]),
            ValueArg::Ints(vec![0, 0]),
            ValueArg::Ints(vec![1, 1]),
            ValueArg::Int(1),
        ])
        .is_err());
    }

    #[test]
    fn test_max_pool2d_defaults_stride_to_kernel() {
        let out = max_pool2d(&[
            tensor_arg(&[1, 3, 8, 8]),
            ValueArg::Ints(vec![2, 2]),
            ValueArg::Ints(vec![]),
            ValueArg::Ints(vec![0, 0]),
            ValueArg::Ints(vec![1, 1]),
            ValueArg::Bool(false),
        ])
        .unwrap();
        assert_eq!(out[0].shape(), &[1, 3, 4, 4]);
    }

    #[test]
    fn test_adaptive_avg_pool2d() {
        let out = adaptive_avg_pool2d(&[tensor_arg(&[3, 8, 8]), ValueArg::Ints(vec![1, 1])]).unwrap();
        assert_eq!(out[0].shape(), &[3, 1, 1]);
    }

    #[test]
    fn test_native_batch_norm_stats_shapes() {
        // Training: per-channel statistics.
        let out = native_batch_norm(&[
            tensor_arg(&[2, 3]),
            ValueArg::None,
            ValueArg::None,
            ValueArg::None,
            ValueArg::None,
            ValueArg::Bool(true),
            ValueArg::Float(1e-4),
            ValueArg::Float(1e-6),
        ])
        .unwrap();
        assert_eq!(out[1].shape(), &[3]);

        // Inference: empty statistics.
        let out = native_batch_norm(&[
            tensor_arg(&[2, 3]),
            ValueArg::None,
            ValueArg::None,
            tensor_arg(&[3]),
            tensor_arg(&[3]),
            ValueArg::Bool(false),
            ValueArg::Float(1e-4),
            ValueArg::Float(1e-6),
        ])
        .unwrap();
        assert_eq!(out[1].shape(), &[0]);
    }

    #[test]
    fn test_nll_loss_forward() {
        let out = nll_loss_forward(&[
            tensor_arg(&[2, 3]),
            index_arg(&[2]),
            ValueArg::None,
            ValueArg::Int(1),
            ValueArg::Int(-100),
        ])
        .unwrap();
        assert_eq!(out[0].shape(), &[] as &[usize]);

        // No reduction keeps the batch dimension.
        let out = nll_loss_forward(&[
            tensor_arg(&[2, 3]),
            index_arg(&[2]),
            ValueArg::None,
            ValueArg::Int(0),
            ValueArg::Int(-100),
        ])
        .unwrap();
        assert_eq!(out[0].shape(), &[2]);

        // Mismatched batch sizes.
        assert!(nll_loss_forward(&[
            tensor_arg(&[2, 3]),
            index_arg(&[7]),
            ValueArg::None,
            ValueArg::Int(1),
            ValueArg::Int(-100),
        ])
        .is_err());
    }
}
