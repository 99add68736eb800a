//! Reference operator implementations used as the verification oracle.
//!
//! Every rule in the catalog has a corresponding reference operator here:
//! an executable implementation that validates its inputs the way the real
//! operator would and materializes outputs with the resulting shapes. The
//! verifier runs these side by side with the rule bodies, so the two must be
//! independent code paths: the reference operators work on materialized
//! [`Value`]s and `usize` dimensions, never on the shape-domain helpers the
//! rules use.
//!
//! Operators are looked up by `(namespace, name)` without the overload
//! qualifier. Each reference operator resolves its own overloads from the
//! kinds and count of its arguments, mirroring how the real dispatcher
//! presents one callable per operator name.

use std::error::Error;
use std::fmt;

use rustc_hash::FxHashMap;
use shapegen_tensor::Tensor;

use crate::args::{Value, ValueArg};

mod elementwise;
mod generate;
mod index;
mod layout;
mod matmul;
mod nn;
mod reduce;

/// Errors raised by reference operators.
#[derive(Clone, Debug, PartialEq)]
pub enum OpError {
    /// Input tensor shapes are not compatible with each other or with the
    /// operator's attributes.
    IncompatibleInputShapes(&'static str),

    /// An input has a value that is incorrect.
    InvalidValue(&'static str),

    /// An input had a different kind than the operator expected.
    InputType(&'static str),
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpError::IncompatibleInputShapes(msg) => write!(f, "incompatible input shapes: {}", msg),
            OpError::InvalidValue(msg) => write!(f, "invalid value: {}", msg),
            OpError::InputType(msg) => write!(f, "input type: {}", msg),
        }
    }
}

impl Error for OpError {}

/// A reference operator.
///
/// Arguments arrive bound: positional and keyword arguments have been
/// aligned against the operator's parameter list with defaults filled in,
/// so `args[i]` is the i-th declared parameter.
pub type Kernel = fn(&[ValueArg]) -> Result<Vec<Value>, OpError>;

/// Resolve a dimension index in `[-ndim, ndim-1]` to `[0, ndim)`. Scalars
/// accept `0` and `-1`.
pub(crate) fn wrap_dim(dim: i64, ndim: usize) -> Result<usize, OpError> {
    let n = ndim.max(1) as i64;
    if dim < -n || dim >= n {
        return Err(OpError::InvalidValue("dimension out of range"));
    }
    if dim < 0 {
        Ok((dim + n) as usize)
    } else {
        Ok(dim as usize)
    }
}

/// Broadcast two shapes together.
pub(crate) fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, OpError> {
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
                return Err(OpError::IncompatibleInputShapes(
                    "shapes cannot be broadcast together",
                ))
            }
        };
        out.push(size);
    }
    Ok(out)
}

/// Convert a dimension-size list to `usize` dimensions, rejecting negative
/// entries.
pub(crate) fn to_dims(sizes: &[i64]) -> Result<Vec<usize>, OpError> {
    sizes
        .iter()
        .map(|&size| {
            usize::try_from(size).map_err(|_| OpError::InvalidValue("negative dimension size"))
        })
        .collect()
}

/// Materialize a float output with the given shape.
pub(crate) fn float_output(shape: Vec<usize>) -> Value {
    Value::Float(Tensor::<f32>::ones(shape))
}

/// Materialize an integer output with the given shape.
pub(crate) fn int_output(shape: Vec<usize>) -> Value {
    Value::Int(Tensor::<i64>::ones(shape))
}

/// Build the operator lookup table.
///
/// The table is keyed by `(namespace, name)` and populated once when the
/// registry loads. Insertion order here fixes nothing observable; lookups
/// are exact-match and misses fail loudly in the registry.
pub(crate) fn kernel_table() -> FxHashMap<(&'static str, &'static str), Kernel> {
    let mut table: FxHashMap<(&'static str, &'static str), Kernel> = FxHashMap::default();
    let mut add = |name: &'static str, kernel: Kernel| {
        table.insert(("aten", name), kernel);
    };

    // Elementwise.
    add("tanh", elementwise::unary);
    add("erf", elementwise::unary);
    add("sigmoid", elementwise::unary);
    add("relu", elementwise::unary);
    add("sqrt", elementwise::unary);
    add("floor", elementwise::unary);
    add("ceil", elementwise::unary);
    add("log", elementwise::unary);
    add("abs", elementwise::unary);
    add("reciprocal", elementwise::unary);
    add("contiguous", elementwise::unary);
    add("gelu", elementwise::gelu);
    add("hardtanh", elementwise::unary);
    add("clamp", elementwise::unary);
    add("dropout", elementwise::dropout);
    add("softmax", elementwise::softmax);
    add("log_softmax", elementwise::softmax);
    add("add", elementwise::binary);
    add("sub", elementwise::binary);
    add("mul", elementwise::binary);
    add("div", elementwise::binary);
    add("eq", elementwise::compare);
    add("gt", elementwise::compare);
    add("lt", elementwise::compare);
    add("minimum", elementwise::binary);
    add("maximum", elementwise::binary);
    add("where", elementwise::where_self);
    add("lerp", elementwise::ternary_broadcast);
    add("addcmul", elementwise::ternary_broadcast);
    add("addcdiv", elementwise::ternary_broadcast);

    // Matrix products.
    add("matmul", matmul::matmul);
    add("mm", matmul::mm);
    add("bmm", matmul::bmm);
    add("addmm", matmul::addmm);
    add("linear", matmul::linear);

    // Reductions.
    add("sum", reduce::full_or_dim_reduce);
    add("mean", reduce::full_or_dim_reduce);
    add("var", reduce::full_reduce);
    add("max", reduce::max);
    add("any", reduce::any_dim);
    add("argmax", reduce::argmax);
    add("topk", reduce::topk);

    // Layout.
    add("t", layout::t);
    add("transpose", layout::transpose);
    add("permute", layout::permute);
    add("unsqueeze", layout::unsqueeze);
    add("squeeze", layout::squeeze);
    add("flatten", layout::flatten);
    add("view", layout::view);
    add("reshape", layout::view);
    add("expand", layout::expand);
    add("broadcast_to", layout::expand);
    add("_shape_as_tensor", layout::shape_as_tensor);
    add("cat", layout::cat);
    add("constant_pad_nd", layout::constant_pad_nd);

    // Indexing.
    add("slice", index::slice);
    add("select", index::select);
    add("index_select", index::index_select);
    add("gather", index::gather);
    add("embedding", index::embedding);
    add("index", index::index);

    // Neural-network ops.
    add("conv2d", nn::conv2d);
    add("max_pool2d", nn::max_pool2d);
    add("adaptive_avg_pool2d", nn::adaptive_avg_pool2d);
    add("batch_norm", nn::batch_norm);
    add("native_batch_norm", nn::native_batch_norm);
    add("native_layer_norm", nn::native_layer_norm);
    add("layer_norm", nn::layer_norm);
    add("nll_loss_forward", nn::nll_loss_forward);
    add("nll_loss_backward", nn::nll_loss_backward);

    // Tensor constructors.
    add("zeros", generate::from_size);
    add("ones", generate::from_size);
    add("full", generate::full);
    add("empty", generate::from_size);
    add("zeros_like", generate::like);
    add("ones_like", generate::like);
    add("full_like", generate::like);
    add("bernoulli", generate::like);
    add("new_zeros", generate::new_from_size);
    add("new_ones", generate::new_from_size);
    add("arange", generate::arange);
    add("bincount", generate::bincount);

    table.insert(("prim", "NumToTensor"), generate::num_to_tensor as Kernel);

    table
}
