//! Shape-domain helpers shared by the rule bodies.
//!
//! Rules compute output shapes from input shapes only, so everything in this
//! module operates on plain dimension lists (`Vec<i64>`). Most operators
//! reduce to a handful of shared computations: copying the input shape,
//! broadcasting two shapes together, contracting matrix dimensions and so on.
//! The helpers validate their inputs the way the corresponding operator
//! would, because rule verification requires rules to fail exactly when the
//! operator fails.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use smallvec::SmallVec;

/// Errors raised by shape function bodies.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeError {
    /// The input shapes are incompatible with each other or with the
    /// operator's attributes.
    IncompatibleShapes(&'static str),

    /// An input's rank does not match what the operator expects, or a
    /// dimension index is out of range.
    IncorrectRank(&'static str),

    /// An argument has an invalid value.
    InvalidValue(&'static str),

    /// An argument had a different kind than the rule expected. Raised by
    /// the typed accessors on shape-domain arguments.
    ArgType(&'static str),
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::IncompatibleShapes(msg) => write!(f, "incompatible shapes: {}", msg),
            ShapeError::IncorrectRank(msg) => write!(f, "incorrect rank: {}", msg),
            ShapeError::InvalidValue(msg) => write!(f, "invalid value: {}", msg),
            ShapeError::ArgType(msg) => write!(f, "argument type: {}", msg),
        }
    }
}

impl Error for ShapeError {}

/// Resolve a dimension index in `[-ndim, ndim-1]` to `[0, ndim)`.
///
/// Negative values count backwards from the last dimension. Zero-dimensional
/// shapes accept `0` and `-1`, matching how operators treat scalars as
/// one-dimensional for indexing purposes.
pub fn maybe_wrap_dim(dim: i64, ndim: usize) -> Result<usize, ShapeError> {
    let n = ndim.max(1) as i64;
    if dim < -n || dim >= n {
        return Err(ShapeError::IncorrectRank("dimension out of range"));
    }
    if dim < 0 {
        Ok((dim + n) as usize)
    } else {
        Ok(dim as usize)
    }
}

/// Shape of an elementwise operator's result: a copy of the input shape.
pub fn unary(shape: &[i64]) -> Vec<i64> {
    shape.to_vec()
}

/// Broadcast two shapes together.
///
/// Shapes are aligned at their trailing dimensions; missing leading
/// dimensions count as size 1, and a size-1 dimension stretches to match the
/// other side.
pub fn broadcast(a: &[i64], b: &[i64]) -> Result<Vec<i64>, ShapeError> {
    let ndim = a.len().max(b.len());
    let mut out = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let size_a = if i + a.len() >= ndim {
            a[i + a.len() - ndim]
        } else {
            1
        };
        let size_b = if i + b.len() >= ndim {
            b[i + b.len() - ndim]
        } else {
            1
        };
        let size = match (size_a, size_b) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(ShapeError::IncompatibleShapes(
                    "sizes do not match and cannot be broadcast",
                ))
            }
        };
        out.push(size);
    }
    Ok(out)
}

/// Matrix product of two rank-2 shapes.
pub fn mm(a: &[i64], b: &[i64]) -> Result<Vec<i64>, ShapeError> {
    if a.len() != 2 || b.len() != 2 {
        return Err(ShapeError::IncorrectRank("mm expects two matrices"));
    }
    if a[1] != b[0] {
        return Err(ShapeError::IncompatibleShapes("mismatching contracting dimension"));
    }
    Ok(vec![a[0], b[1]])
}

/// General matrix product with batching and vector promotion.
///
/// Rank-1 operands are promoted to matrices for the contraction (a row
/// vector on the left, a column vector on the right) and the promoted
/// dimension is dropped from the result. Leading batch dimensions broadcast.
pub fn matmul(self_shape: &[i64], other: &[i64]) -> Result<Vec<i64>, ShapeError> {
    let dim1 = self_shape.len();
    let dim2 = other.len();
    if dim1 == 0 || dim2 == 0 {
        return Err(ShapeError::IncorrectRank("matmul arguments must be at least 1-D"));
    }
    match (dim1, dim2) {
        (1, 1) => {
            if self_shape[0] != other[0] {
                return Err(ShapeError::IncompatibleShapes("mismatching contracting dimension"));
            }
            Ok(Vec::new())
        }
        (2, 1) => {
            if self_shape[1] != other[0] {
                return Err(ShapeError::IncompatibleShapes("mismatching contracting dimension"));
            }
            Ok(vec![self_shape[0]])
        }
        (1, 2) => {
            if self_shape[0] != other[0] {
                return Err(ShapeError::IncompatibleShapes("mismatching contracting dimension"));
            }
            Ok(vec![other[1]])
        }
        (2, 2) => mm(self_shape, other),
        _ => {
            let (lhs, lhs_promoted) = if dim1 == 1 {
                (vec![1, self_shape[0]], true)
            } else {
                (self_shape.to_vec(), false)
            };
            let (rhs, rhs_promoted) = if dim2 == 1 {
                (vec![other[0], 1], true)
            } else {
                (other.to_vec(), false)
            };
            let m = lhs[lhs.len() - 2];
            let k1 = lhs[lhs.len() - 1];
            let k2 = rhs[rhs.len() - 2];
            let n = rhs[rhs.len() - 1];
            if k1 != k2 {
                return Err(ShapeError::IncompatibleShapes("mismatching contracting dimension"));
            }
            let mut out = broadcast(&lhs[..lhs.len() - 2], &rhs[..rhs.len() - 2])?;
            if !lhs_promoted {
                out.push(m);
            }
            if !rhs_promoted {
                out.push(n);
            }
            Ok(out)
        }
    }
}

/// Shape of `addmm`: `self` broadcast against the `mat1 @ mat2` product.
pub fn addmm(self_shape: &[i64], mat1: &[i64], mat2: &[i64]) -> Result<Vec<i64>, ShapeError> {
    broadcast(self_shape, &mm(mat1, mat2)?)
}

/// Transpose of a rank <= 2 shape. Scalars and vectors are unchanged.
pub fn t(shape: &[i64]) -> Result<Vec<i64>, ShapeError> {
    match shape.len() {
        0 | 1 => Ok(shape.to_vec()),
        2 => Ok(vec![shape[1], shape[0]]),
        _ => Err(ShapeError::IncorrectRank("t() expects a tensor with at most 2 dimensions")),
    }
}

/// Shape of `linear`: `input @ weight.T`, checked against the bias.
pub fn linear(
    input: &[i64],
    weight: &[i64],
    bias: Option<&[i64]>,
) -> Result<Vec<i64>, ShapeError> {
    let out = matmul(input, &t(weight)?)?;
    if let Some(bias) = bias {
        if broadcast(bias, &out)? != out {
            return Err(ShapeError::IncompatibleShapes("bias cannot be broadcast to the output"));
        }
    }
    Ok(out)
}

/// Swap two dimensions of a shape.
pub fn transpose(shape: &[i64], dim0: i64, dim1: i64) -> Result<Vec<i64>, ShapeError> {
    let dim0 = maybe_wrap_dim(dim0, shape.len())?;
    let dim1 = maybe_wrap_dim(dim1, shape.len())?;
    let mut out = shape.to_vec();
    out.swap(dim0, dim1);
    Ok(out)
}

/// Reorder the dimensions of a shape. `dims` must be a permutation of
/// `0..ndim` after wrapping negative values.
pub fn permute(shape: &[i64], dims: &[i64]) -> Result<Vec<i64>, ShapeError> {
    if dims.len() != shape.len() {
        return Err(ShapeError::IncorrectRank(
            "number of dims does not match the number of dimensions",
        ));
    }
    let mut seen = vec![false; shape.len()];
    let mut out = Vec::with_capacity(shape.len());
    for &dim in dims {
        let dim = maybe_wrap_dim(dim, shape.len())?;
        if seen[dim] {
            return Err(ShapeError::InvalidValue("repeated dim in permute"));
        }
        seen[dim] = true;
        out.push(shape[dim]);
    }
    Ok(out)
}

/// Insert a size-1 dimension at `dim`.
pub fn unsqueeze(shape: &[i64], dim: i64) -> Result<Vec<i64>, ShapeError> {
    let dim = maybe_wrap_dim(dim, shape.len() + 1)?;
    let mut out = shape.to_vec();
    out.insert(dim, 1);
    Ok(out)
}

/// Remove every size-1 dimension.
pub fn squeeze_nodim(shape: &[i64]) -> Vec<i64> {
    shape.iter().copied().filter(|&size| size != 1).collect()
}

/// Remove dimension `dim` if it has size 1.
pub fn squeeze_dim(shape: &[i64], dim: i64) -> Result<Vec<i64>, ShapeError> {
    let dim = maybe_wrap_dim(dim, shape.len())?;
    let mut out = shape.to_vec();
    if !out.is_empty() && out[dim] == 1 {
        out.remove(dim);
    }
    Ok(out)
}

/// Collapse dimensions `start_dim..=end_dim` into one.
pub fn flatten(shape: &[i64], start_dim: i64, end_dim: i64) -> Result<Vec<i64>, ShapeError> {
    let start = maybe_wrap_dim(start_dim, shape.len())?;
    let end = maybe_wrap_dim(end_dim, shape.len())?;
    if start > end {
        return Err(ShapeError::InvalidValue("flatten start_dim must not exceed end_dim"));
    }
    if shape.is_empty() {
        return Ok(vec![1]);
    }
    let mut out = Vec::with_capacity(shape.len() - (end - start));
    out.extend_from_slice(&shape[..start]);
    out.push(shape[start..=end].iter().product());
    out.extend_from_slice(&shape[end + 1..]);
    Ok(out)
}

/// Shape of `view`/`reshape`: validate `size` against the element count and
/// infer at most one `-1` dimension.
pub fn view(shape: &[i64], size: &[i64]) -> Result<Vec<i64>, ShapeError> {
    let numel: i64 = shape.iter().product();
    let mut inferred = None;
    let mut known: i64 = 1;
    for (i, &s) in size.iter().enumerate() {
        if s == -1 {
            if inferred.is_some() {
                return Err(ShapeError::InvalidValue("only one dimension can be inferred"));
            }
            inferred = Some(i);
        } else if s < 0 {
            return Err(ShapeError::InvalidValue("invalid shape dimension"));
        } else {
            known *= s;
        }
    }
    let mut out = size.to_vec();
    if let Some(i) = inferred {
        if known == 0 || numel % known != 0 {
            return Err(ShapeError::IncompatibleShapes("shape is invalid for input size"));
        }
        out[i] = numel / known;
    } else if known != numel {
        return Err(ShapeError::IncompatibleShapes("shape is invalid for input size"));
    }
    Ok(out)
}

/// Shape of `expand`: stretch size-1 dimensions of `shape` to `size`,
/// keeping dimensions where `size` has `-1`.
pub fn expand(shape: &[i64], size: &[i64]) -> Result<Vec<i64>, ShapeError> {
    if size.len() < shape.len() {
        return Err(ShapeError::IncorrectRank(
            "expanded size must have at least as many dimensions as the input",
        ));
    }
    let offset = size.len() - shape.len();
    let mut out = Vec::with_capacity(size.len());
    for i in 0..size.len() {
        if i < offset {
            if size[i] == -1 {
                return Err(ShapeError::InvalidValue(
                    "expanded size -1 is not allowed in a leading dimension",
                ));
            }
            out.push(size[i]);
        } else {
            let existing = shape[i - offset];
            let target = size[i];
            if target == -1 || target == existing {
                out.push(existing);
            } else if existing == 1 {
                out.push(target);
            } else {
                return Err(ShapeError::IncompatibleShapes(
                    "expanded size must match the existing size",
                ));
            }
        }
    }
    Ok(out)
}

/// Shape of `select`: remove dimension `dim` after bounds-checking `index`.
pub fn select(shape: &[i64], dim: i64, index: i64) -> Result<Vec<i64>, ShapeError> {
    if shape.is_empty() {
        return Err(ShapeError::IncorrectRank("select() cannot be applied to a 0-dim tensor"));
    }
    let dim = maybe_wrap_dim(dim, shape.len())?;
    let size = shape[dim];
    if index < -size || index >= size {
        return Err(ShapeError::InvalidValue("select index out of range"));
    }
    let mut out = shape.to_vec();
    out.remove(dim);
    Ok(out)
}

/// Shape of `slice` along one dimension.
pub fn slice(
    shape: &[i64],
    dim: i64,
    start: Option<i64>,
    end: Option<i64>,
    step: i64,
) -> Result<Vec<i64>, ShapeError> {
    if shape.is_empty() {
        return Err(ShapeError::IncorrectRank("slice() cannot be applied to a 0-dim tensor"));
    }
    if step <= 0 {
        return Err(ShapeError::InvalidValue("slice step must be positive"));
    }
    let dim = maybe_wrap_dim(dim, shape.len())?;
    let size = shape[dim];
    let mut start = start.unwrap_or(0);
    let mut end = end.unwrap_or(i64::MAX);
    if start < 0 {
        start += size;
    }
    if end < 0 {
        end += size;
    }
    let start = start.clamp(0, size);
    let end = end.clamp(start, size);
    let mut out = shape.to_vec();
    out[dim] = (end - start + step - 1) / step;
    Ok(out)
}

/// Shape of `index_select`: dimension `dim` is replaced by the index length.
pub fn index_select(shape: &[i64], dim: i64, index: &[i64]) -> Result<Vec<i64>, ShapeError> {
    if index.len() > 1 {
        return Err(ShapeError::IncorrectRank("index_select index must be 0-D or 1-D"));
    }
    let dim = maybe_wrap_dim(dim, shape.len())?;
    let numel: i64 = index.iter().product();
    let mut out = shape.to_vec();
    if !out.is_empty() {
        out[dim] = numel;
    }
    Ok(out)
}

/// Shape of `embedding`: indices shape plus the embedding width.
pub fn embedding(weight: &[i64], indices: &[i64]) -> Result<Vec<i64>, ShapeError> {
    if weight.len() != 2 {
        return Err(ShapeError::IncorrectRank("embedding weight must be 2-D"));
    }
    let mut out = indices.to_vec();
    out.push(weight[1]);
    Ok(out)
}

/// Shape of `cat` along `dim`. Shapes equal to `[0]` stand for legacy empty
/// tensors and are skipped.
pub fn cat(shapes: &[Vec<i64>], dim: i64) -> Result<Vec<i64>, ShapeError> {
    if shapes.is_empty() {
        return Err(ShapeError::InvalidValue("expected a non-empty list of tensors"));
    }
    let non_empty: Vec<&Vec<i64>> = shapes
        .iter()
        .filter(|shape| !(shape.len() == 1 && shape[0] == 0))
        .collect();
    let Some(first) = non_empty.first() else {
        return Ok(vec![0]);
    };
    if first.is_empty() {
        return Err(ShapeError::IncorrectRank("zero-dimensional tensors cannot be concatenated"));
    }
    let dim = maybe_wrap_dim(dim, first.len())?;
    let mut out = (*first).clone();
    out[dim] = 0;
    for shape in &non_empty {
        if shape.len() != first.len() {
            return Err(ShapeError::IncompatibleShapes(
                "tensors must have the same number of dimensions",
            ));
        }
        for i in 0..shape.len() {
            if i != dim && shape[i] != first[i] {
                return Err(ShapeError::IncompatibleShapes(
                    "sizes of tensors must match except in the concatenated dimension",
                ));
            }
        }
        out[dim] += shape[dim];
    }
    Ok(out)
}

/// Reduce along a single dimension, optionally keeping it with size 1.
pub fn reduce_along_dim(shape: &[i64], dim: i64, keepdim: bool) -> Result<Vec<i64>, ShapeError> {
    let dim = maybe_wrap_dim(dim, shape.len())?;
    let mut out = Vec::with_capacity(shape.len());
    for (i, &size) in shape.iter().enumerate() {
        if i == dim {
            if keepdim {
                out.push(1);
            }
        } else {
            out.push(size);
        }
    }
    Ok(out)
}

/// Reduce along several dimensions. An empty `dims` list reduces every
/// dimension.
pub fn reduce_dims(shape: &[i64], dims: &[i64], keepdim: bool) -> Result<Vec<i64>, ShapeError> {
    if dims.is_empty() {
        return Ok(if keepdim { vec![1; shape.len()] } else { Vec::new() });
    }
    let mut axes: SmallVec<[usize; 4]> = SmallVec::with_capacity(dims.len());
    for &dim in dims {
        axes.push(maybe_wrap_dim(dim, shape.len())?);
    }
    axes.sort_unstable();
    axes.dedup();
    let mut out = Vec::with_capacity(shape.len());
    for (i, &size) in shape.iter().enumerate() {
        if axes.contains(&i) {
            if keepdim {
                out.push(1);
            }
        } else {
            out.push(size);
        }
    }
    Ok(out)
}

fn expect_pair(list: &[i64], what: &'static str) -> Result<(i64, i64), ShapeError> {
    match list {
        [both] => Ok((*both, *both)),
        [first, second] => Ok((*first, *second)),
        _ => Err(ShapeError::InvalidValue(what)),
    }
}

/// Shape of `conv2d`.
pub fn conv2d(
    input: &[i64],
    weight: &[i64],
    bias: Option<&[i64]>,
    stride: &[i64],
    padding: &[i64],
    dilation: &[i64],
    groups: i64,
) -> Result<Vec<i64>, ShapeError> {
    if input.len() != 4 {
        return Err(ShapeError::IncorrectRank("conv2d expects a 4-D input"));
    }
    if weight.len() != 4 {
        return Err(ShapeError::IncorrectRank("conv2d expects a 4-D weight"));
    }
    if groups < 1 {
        return Err(ShapeError::InvalidValue("groups must be positive"));
    }
    if input[1] != weight[1] * groups {
        return Err(ShapeError::IncompatibleShapes(
            "input channels do not match weight channels times groups",
        ));
    }
    if weight[0] % groups != 0 {
        return Err(ShapeError::IncompatibleShapes(
            "output channels must be divisible by groups",
        ));
    }
    if let Some(bias) = bias {
        if bias.len() != 1 || bias[0] != weight[0] {
            return Err(ShapeError::IncompatibleShapes("bias size must match output channels"));
        }
    }
    let stride = expect_pair(stride, "conv2d stride must have 1 or 2 elements")?;
    let padding = expect_pair(padding, "conv2d padding must have 1 or 2 elements")?;
    let dilation = expect_pair(dilation, "conv2d dilation must have 1 or 2 elements")?;
    let strides = [stride.0, stride.1];
    let paddings = [padding.0, padding.1];
    let dilations = [dilation.0, dilation.1];
    let mut out = vec![input[0], weight[0]];
    for i in 0..2 {
        if strides[i] < 1 {
            return Err(ShapeError::InvalidValue("stride must be positive"));
        }
        let numerator = input[2 + i] + 2 * paddings[i] - dilations[i] * (weight[2 + i] - 1) - 1;
        if numerator < 0 {
            return Err(ShapeError::IncompatibleShapes("calculated output size is too small"));
        }
        out.push(numerator / strides[i] + 1);
    }
    Ok(out)
}

/// Output size of one pooled dimension, following the pooling arithmetic
/// used by 2-D pooling operators.
fn pooled_size(
    input: i64,
    kernel: i64,
    stride: i64,
    padding: i64,
    dilation: i64,
    ceil_mode: bool,
) -> Result<i64, ShapeError> {
    if stride < 1 {
        return Err(ShapeError::InvalidValue("stride must be positive"));
    }
    if padding * 2 > kernel {
        return Err(ShapeError::InvalidValue("padding should be at most half of kernel size"));
    }
    let mut numerator = input + 2 * padding - dilation * (kernel - 1) - 1;
    if ceil_mode {
        numerator += stride - 1;
    }
    if numerator < 0 {
        return Err(ShapeError::IncompatibleShapes("calculated output size is too small"));
    }
    let mut out = numerator / stride + 1;
    if ceil_mode && (out - 1) * stride >= input + padding {
        out -= 1;
    }
    if out < 1 {
        return Err(ShapeError::IncompatibleShapes("calculated output size is too small"));
    }
    Ok(out)
}

/// Shape of `max_pool2d`.
pub fn max_pool2d(
    input: &[i64],
    kernel_size: &[i64],
    stride: &[i64],
    padding: &[i64],
    dilation: &[i64],
    ceil_mode: bool,
) -> Result<Vec<i64>, ShapeError> {
    if input.len() != 3 && input.len() != 4 {
        return Err(ShapeError::IncorrectRank("max_pool2d expects a 3-D or 4-D input"));
    }
    let kernel = expect_pair(kernel_size, "kernel_size must have 1 or 2 elements")?;
    let stride = if stride.is_empty() {
        kernel
    } else {
        expect_pair(stride, "stride must have 1 or 2 elements")?
    };
    let padding = expect_pair(padding, "padding must have 1 or 2 elements")?;
    let dilation = expect_pair(dilation, "dilation must have 1 or 2 elements")?;
    let spatial = input.len() - 2;
    let mut out = input[..spatial].to_vec();
    out.push(pooled_size(input[spatial], kernel.0, stride.0, padding.0, dilation.0, ceil_mode)?);
    out.push(pooled_size(
        input[spatial + 1],
        kernel.1,
        stride.1,
        padding.1,
        dilation.1,
        ceil_mode,
    )?);
    Ok(out)
}

/// Shape of `adaptive_avg_pool2d`.
pub fn adaptive_avg_pool2d(input: &[i64], output_size: &[i64]) -> Result<Vec<i64>, ShapeError> {
    if input.len() != 3 && input.len() != 4 {
        return Err(ShapeError::IncorrectRank(
            "adaptive_avg_pool2d expects a 3-D or 4-D input",
        ));
    }
    if output_size.len() != 2 {
        return Err(ShapeError::InvalidValue("output_size must have 2 elements"));
    }
    let mut out = input[..input.len() - 2].to_vec();
    out.extend_from_slice(output_size);
    Ok(out)
}

/// Number of elements produced by `arange(start, end, step)`.
pub fn arange_start_step(start: f64, end: f64, step: f64) -> Result<Vec<i64>, ShapeError> {
    if step == 0. {
        return Err(ShapeError::InvalidValue("step must be nonzero"));
    }
    if (step > 0. && end < start) || (step < 0. && end > start) {
        return Err(ShapeError::InvalidValue(
            "upper bound and lower bound inconsistent with step sign",
        ));
    }
    Ok(vec![((end - start) / step).ceil() as i64])
}

/// Number of elements produced by `arange(start, end)`.
pub fn arange_start(start: f64, end: f64) -> Result<Vec<i64>, ShapeError> {
    arange_start_step(start, end, 1.)
}

/// Number of elements produced by `arange(end)`.
pub fn arange_end(end: f64) -> Result<Vec<i64>, ShapeError> {
    arange_start(0., end)
}

static NEXT_UNKNOWN_DIM: AtomicI64 = AtomicI64::new(1 << 40);

/// Return an opaque stand-in for a dimension size that cannot be computed
/// from input shapes (data-dependent outputs such as `bincount`).
///
/// Every call returns a distinct value, so the consuming refinement pass
/// sees an unfoldable integer with a known rank.
pub fn unknown_dim() -> i64 {
    NEXT_UNKNOWN_DIM.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use shapegen_testing::TestCases;

    use super::{
        arange_end, arange_start_step, broadcast, cat, conv2d, expand, flatten, matmul,
        max_pool2d, maybe_wrap_dim, mm, permute, reduce_dims, select, slice, squeeze_nodim,
        unknown_dim, view, ShapeError,
    };

    #[test]
    fn test_maybe_wrap_dim() {
        assert_eq!(maybe_wrap_dim(0, 3), Ok(0));
        assert_eq!(maybe_wrap_dim(2, 3), Ok(2));
        assert_eq!(maybe_wrap_dim(-1, 3), Ok(2));
        assert_eq!(maybe_wrap_dim(-3, 3), Ok(0));
        assert_eq!(maybe_wrap_dim(0, 0), Ok(0));
        assert_eq!(maybe_wrap_dim(-1, 0), Ok(0));
        assert!(maybe_wrap_dim(3, 3).is_err());
        assert!(maybe_wrap_dim(-4, 3).is_err());
    }

    #[test]
    fn test_broadcast() {
        #[derive(Debug)]
        struct Case {
            a: Vec<i64>,
            b: Vec<i64>,
            expected: Result<Vec<i64>, ShapeError>,
        }

        let cases = [
            Case {
                a: vec![2, 3],
                b: vec![2, 3],
                expected: Ok(vec![2, 3]),
            },
            Case {
                a: vec![2, 3],
                b: vec![3],
                expected: Ok(vec![2, 3]),
            },
            Case {
                a: vec![1, 5],
                b: vec![4, 1],
                expected: Ok(vec![4, 5]),
            },
            Case {
                a: vec![],
                b: vec![2, 3],
                expected: Ok(vec![2, 3]),
            },
            Case {
                a: vec![2, 3],
                b: vec![4, 3],
                expected: Err(ShapeError::IncompatibleShapes(
                    "sizes do not match and cannot be broadcast",
                )),
            },
        ];

        cases.test_each(|case| {
            assert_eq!(broadcast(&case.a, &case.b), case.expected);
        });
    }

    #[test]
    fn test_matmul() {
        #[derive(Debug)]
        struct Case {
            a: Vec<i64>,
            b: Vec<i64>,
            expected: Option<Vec<i64>>,
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
                a: vec![3],
                b: vec![3, 4],
                expected: Some(vec![4]),
            },
            Case {
                a: vec![2, 3],
                b: vec![3, 4],
                expected: Some(vec![2, 4]),
            },
            Case {
                a: vec![5, 2, 3],
                b: vec![3, 4],
                expected: Some(vec![5, 2, 4]),
            },
            Case {
                a: vec![1, 2, 3],
                b: vec![5, 3, 4],
                expected: Some(vec![5, 2, 4]),
            },
            Case {
                a: vec![5, 2, 3],
                b: vec![3],
                expected: Some(vec![5, 2]),
            },
            Case {
                a: vec![2, 3],
                b: vec![4, 5],
                expected: None,
            },
            Case {
                a: vec![],
                b: vec![3],
                expected: None,
            },
        ];

        cases.test_each(|case| {
            let result = matmul(&case.a, &case.b);
            match &case.expected {
                Some(shape) => assert_eq!(result.as_ref(), Ok(shape)),
                None => assert!(result.is_err()),
            }
        });
    }

    #[test]
    fn test_mm_requires_matrices() {
        assert!(mm(&[2], &[2, 3]).is_err());
        assert!(mm(&[2, 3], &[4, 5]).is_err());
        assert_eq!(mm(&[2, 3], &[3, 4]), Ok(vec![2, 4]));
    }

    #[test]
    fn test_layout_helpers() {
        assert_eq!(permute(&[2, 3, 4], &[2, 0, 1]), Ok(vec![4, 2, 3]));
        assert!(permute(&[2, 3, 4], &[0, 0, 1]).is_err());
        assert!(permute(&[2, 3, 4], &[0, 1]).is_err());
        assert_eq!(squeeze_nodim(&[1, 2, 1, 3]), vec![2, 3]);
        assert_eq!(flatten(&[2, 3, 4], 1, -1), Ok(vec![2, 12]));
        assert_eq!(flatten(&[2, 3, 4], 0, 0), Ok(vec![2, 3, 4]));
        assert_eq!(select(&[2, 3], 1, -1), Ok(vec![2]));
        assert!(select(&[2, 3], 1, 3).is_err());
    }

    #[test]
    fn test_view() {
        assert_eq!(view(&[2, 3, 4], &[6, 4]), Ok(vec![6, 4]));
        assert_eq!(view(&[2, 3, 4], &[-1, 4]), Ok(vec![6, 4]));
        assert!(view(&[2, 3, 4], &[5, 5]).is_err());
        assert!(view(&[2, 3, 4], &[-1, -1]).is_err());
        assert!(view(&[2, 3, 4], &[-1, 5]).is_err());
    }

    #[test]
    fn test_expand() {
        assert_eq!(expand(&[1, 3], &[4, 3]), Ok(vec![4, 3]));
        assert_eq!(expand(&[1, 3], &[2, -1, 3]), Ok(vec![2, 1, 3]));
        assert!(expand(&[2, 3], &[4, 3]).is_err());
        assert!(expand(&[2, 3], &[3]).is_err());
    }

    #[test]
    fn test_slice() {
        assert_eq!(slice(&[10], 0, None, None, 1), Ok(vec![10]));
        assert_eq!(slice(&[10], 0, Some(2), Some(8), 2), Ok(vec![3]));
        assert_eq!(slice(&[10], 0, Some(-3), None, 1), Ok(vec![3]));
        assert_eq!(slice(&[10], 0, Some(4), Some(2), 1), Ok(vec![0]));
        assert!(slice(&[10], 0, None, None, 0).is_err());
    }

    #[test]
    fn test_cat() {
        assert_eq!(
            cat(&[vec![2, 3], vec![4, 3]], 0),
            Ok(vec![6, 3])
        );
        assert_eq!(cat(&[vec![2, 3], vec![0]], 0), Ok(vec![2, 3]));
        assert!(cat(&[vec![2, 3], vec![2, 4]], 0).is_err());
        assert!(cat(&[], 0).is_err());
    }

    #[test]
    fn test_reduce_dims() {
        assert_eq!(reduce_dims(&[2, 3, 4], &[1], false), Ok(vec![2, 4]));
        assert_eq!(reduce_dims(&[2, 3, 4], &[1], true), Ok(vec![2, 1, 4]));
        assert_eq!(reduce_dims(&[2, 3, 4], &[-1, 1], false), Ok(vec![2]));
        assert_eq!(reduce_dims(&[2, 3, 4], &[], false), Ok(vec![]));
        assert!(reduce_dims(&[2, 3, 4], &[3], false).is_err());
    }

    #[test]
    fn test_conv2d() {
        // 1x1 convolution preserves the spatial size.
        assert_eq!(
            conv2d(&[1, 3, 8, 8], &[16, 3, 1, 1], None, &[1, 1], &[0, 0], &[1, 1], 1),
            Ok(vec![1, 16, 8, 8])
        );
        // 3x3 kernel with stride 2.
        assert_eq!(
            conv2d(&[2, 3, 9, 9], &[8, 3, 3, 3], Some(&[8]), &[2, 2], &[0, 0], &[1, 1], 1),
            Ok(vec![2, 8, 4, 4])
        );
        // Channel mismatch.
        assert!(conv2d(&[1, 4, 8, 8], &[16, 3, 1, 1], None, &[1, 1], &[0, 0], &[1, 1], 1).is_err());
        // Kernel larger than the padded input.
        assert!(conv2d(&[1, 3, 2, 2], &[8, 3, 5, 5], None, &[1, 1], &[0, 0], &[1, 1], 1).is_err());
    }

    #[test]
    fn test_max_pool2d() {
        #[derive(Debug)]
        struct Case {
            input: Vec<i64>,
            kernel: Vec<i64>,
            stride: Vec<i64>,
            ceil_mode: bool,
            expected: Option<Vec<i64>>,
        }

        let cases = [
            Case {
                input: vec![1, 3, 8, 8],
                kernel: vec![2, 2],
                stride: vec![],
                ceil_mode: false,
                expected: Some(vec![1, 3, 4, 4]),
            },
            Case {
                input: vec![3, 7, 7],
                kernel: vec![2, 2],
                stride: vec![2, 2],
                ceil_mode: false,
                expected: Some(vec![3, 3, 3]),
            },
            Case {
                input: vec![3, 7, 7],
                kernel: vec![2, 2],
                stride: vec![2, 2],
                ceil_mode: true,
                expected: Some(vec![3, 4, 4]),
            },
            Case {
                input: vec![3, 7],
                kernel: vec![2, 2],
                stride: vec![],
                ceil_mode: false,
                expected: None,
            },
        ];

        cases.test_each(|case| {
            let result = max_pool2d(
                &case.input,
                &case.kernel,
                &case.stride,
                &[0, 0],
                &[1, 1],
                case.ceil_mode,
            );
            match &case.expected {
                Some(shape) => assert_eq!(result.as_ref(), Ok(shape)),
                None => assert!(result.is_err()),
            }
        });
    }

    #[test]
    fn test_arange() {
        assert_eq!(arange_end(5.), Ok(vec![5]));
        assert_eq!(arange_end(2.5), Ok(vec![3]));
        assert_eq!(arange_start_step(1., 7., 2.), Ok(vec![3]));
        assert_eq!(arange_start_step(7., 1., -2.), Ok(vec![3]));
        assert!(arange_end(-1.).is_err());
        assert!(arange_start_step(1., 7., 0.).is_err());
    }

    #[test]
    fn test_unknown_dim_is_unique() {
        assert_ne!(unknown_dim(), unknown_dim());
    }
}
