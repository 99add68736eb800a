//! The shape rule catalog.
//!
//! Every rule pairs a `def` line in the rule definition language with a
//! Rust body computing the same shapes, plus the invocations that verify
//! the rule against its reference operator. The two must stay in lockstep:
//! the `def` line is what the compiler exports and what signature
//! conformance checks against the registry, while the body is what
//! verification executes.
//!
//! Rules for operators with interesting shape behavior carry invocations
//! covering both the success and the failure cases. Trivial rules (mostly
//! elementwise operators) lean on the shared bodies and are tested through
//! a few representatives.

use crate::args::{long_tensor, Arg, Invocation, ShapeArg, TensorOfShape};
use crate::rules::{RuleCatalog, RuleError};
use crate::shape_fns as fns;
use crate::shape_fns::ShapeError;

fn ts(shape: &[usize]) -> Arg {
    Arg::Tensor(TensorOfShape::new(shape))
}

fn lt(shape: &[usize]) -> Arg {
    Arg::Tensor(long_tensor(shape))
}

fn ints(values: &[i64]) -> Arg {
    Arg::List(values.iter().copied().map(Arg::Int).collect())
}

// Shared rule bodies.

/// Output shape equals the first argument's shape.
fn same_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::unary(&args[0].ints()?)))
}

/// Output shape is the first argument itself (constructors that return
/// their size argument unchanged).
fn identity_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    args[0].ints()?;
    Ok(args[0].clone())
}

/// Output shape is the second argument (an explicit size list).
fn new_size_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    args[1].ints()?;
    Ok(args[1].clone())
}

/// Scalar result, whatever the input shape.
fn scalar_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    args[0].ints()?;
    Ok(ShapeArg::Ints(Vec::new()))
}

fn broadcast_pair(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::broadcast(&args[0].ints()?, &args[1].ints()?)?))
}

fn broadcast_triple(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let tail = fns::broadcast(&args[1].ints()?, &args[2].ints()?)?;
    Ok(ShapeArg::Ints(fns::broadcast(&args[0].ints()?, &tail)?))
}

// Matrix products.

fn matmul_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::matmul(&args[0].ints()?, &args[1].ints()?)?))
}

fn mm_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::mm(&args[0].ints()?, &args[1].ints()?)?))
}

fn bmm_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let a = args[0].ints()?;
    let b = args[1].ints()?;
    if a.len() != 3 || b.len() != 3 {
        return Err(ShapeError::IncorrectRank("bmm only supports 3-D tensors"));
    }
    if a[0] != b[0] {
        return Err(ShapeError::IncompatibleShapes("mismatching batch dimension"));
    }
    if a[2] != b[1] {
        return Err(ShapeError::IncompatibleShapes("mismatching contracting dimension"));
    }
    Ok(ShapeArg::Ints(vec![a[0], a[1], b[2]]))
}

fn addmm_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::addmm(
        &args[0].ints()?,
        &args[1].ints()?,
        &args[2].ints()?,
    )?))
}

fn linear_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let bias = args[2].opt_ints()?;
    Ok(ShapeArg::Ints(fns::linear(
        &args[0].ints()?,
        &args[1].ints()?,
        bias.as_deref(),
    )?))
}

// Reductions.

fn argmax_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let Some(dim) = args[1].opt_int()? else {
        return Ok(ShapeArg::Ints(Vec::new()));
    };
    let keepdim = args[2].boolean()?;
    Ok(ShapeArg::Ints(fns::reduce_along_dim(&args[0].ints()?, dim, keepdim)?))
}

fn reduce_dim_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::reduce_along_dim(
        &args[0].ints()?,
        args[1].int()?,
        args[2].boolean()?,
    )?))
}

fn max_dim_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let reduced = fns::reduce_along_dim(&args[0].ints()?, args[1].int()?, args[2].boolean()?)?;
    Ok(ShapeArg::Tuple(vec![
        ShapeArg::Ints(reduced.clone()),
        ShapeArg::Ints(reduced),
    ]))
}

fn reduce_dim_list_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::reduce_dims(
        &args[0].ints()?,
        &args[1].ints()?,
        args[2].boolean()?,
    )?))
}

fn topk_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let k = args[1].int()?;
    let dim = args[2].int()?;
    let shape = args[0].ints_mut()?;
    let dim = fns::maybe_wrap_dim(dim, shape.len())?;
    if k < 0 || k > shape[dim] {
        return Err(ShapeError::InvalidValue("k is too big for the selected dimension"));
    }
    // Shape lists are freshly allocated per invocation, so in-place
    // mutation is allowed.
    shape[dim] = k;
    let out = shape.clone();
    Ok(ShapeArg::Tuple(vec![
        ShapeArg::Ints(out.clone()),
        ShapeArg::Ints(out),
    ]))
}

// Layout.

fn t_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::t(&args[0].ints()?)?))
}

fn transpose_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::transpose(
        &args[0].ints()?,
        args[1].int()?,
        args[2].int()?,
    )?))
}

fn permute_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::permute(&args[0].ints()?, &args[1].ints()?)?))
}

fn unsqueeze_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::unsqueeze(&args[0].ints()?, args[1].int()?)?))
}

fn squeeze_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::squeeze_nodim(&args[0].ints()?)))
}

fn squeeze_dim_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::squeeze_dim(&args[0].ints()?, args[1].int()?)?))
}

fn flatten_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::flatten(
        &args[0].ints()?,
        args[1].int()?,
        args[2].int()?,
    )?))
}

fn view_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::view(&args[0].ints()?, &args[1].ints()?)?))
}

fn expand_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::expand(&args[0].ints()?, &args[1].ints()?)?))
}

fn shape_as_tensor_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(vec![args[0].ints()?.len() as i64]))
}

fn cat_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::cat(&args[0].shape_list()?, args[1].int()?)?))
}

fn pad_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let pad = args[1].ints()?;
    let shape = args[0].ints_mut()?;
    if pad.len() % 2 != 0 {
        return Err(ShapeError::InvalidValue("must have paired low-high pad amount values"));
    }
    if pad.len() / 2 > shape.len() {
        return Err(ShapeError::IncompatibleShapes(
            "number of padded dimensions must not exceed the input dimensions",
        ));
    }
    // Pad amounts pair up from the rightmost dimension inwards.
    let ndim = shape.len();
    for i in 0..pad.len() / 2 {
        shape[ndim - 1 - i] += pad[2 * i] + pad[2 * i + 1];
    }
    Ok(ShapeArg::Ints(shape.clone()))
}

// Indexing.

fn slice_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::slice(
        &args[0].ints()?,
        args[1].int()?,
        args[2].opt_int()?,
        args[3].opt_int()?,
        args[4].int()?,
    )?))
}

fn select_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::select(
        &args[0].ints()?,
        args[1].int()?,
        args[2].int()?,
    )?))
}

fn index_select_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::index_select(
        &args[0].ints()?,
        args[1].int()?,
        &args[2].ints()?,
    )?))
}

/// `gather` output has the index's shape.
fn gather_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::unary(&args[2].ints()?)))
}

fn embedding_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::embedding(&args[0].ints()?, &args[1].ints()?)?))
}

fn index_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let self_shape = args[0].ints()?;
    let indices = args[1].opt_shape_list()?;
    if indices.len() > self_shape.len() {
        return Err(ShapeError::IncompatibleShapes("more indices than dimensions to index"));
    }
    let mut out: Vec<i64> = Vec::new();
    for index_shape in indices.iter().flatten() {
        out = fns::broadcast(&out, index_shape)?;
    }
    Ok(ShapeArg::Ints(out))
}

// Neural-network ops.

fn conv2d_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let bias = args[2].opt_ints()?;
    Ok(ShapeArg::Ints(fns::conv2d(
        &args[0].ints()?,
        &args[1].ints()?,
        bias.as_deref(),
        &args[3].ints()?,
        &args[4].ints()?,
        &args[5].ints()?,
        args[6].int()?,
    )?))
}

fn max_pool2d_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::max_pool2d(
        &args[0].ints()?,
        &args[1].ints()?,
        &args[2].ints()?,
        &args[3].ints()?,
        &args[4].ints()?,
        args[5].boolean()?,
    )?))
}

fn adaptive_pool_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::adaptive_avg_pool2d(
        &args[0].ints()?,
        &args[1].ints()?,
    )?))
}

fn native_batch_norm_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let input = args[0].ints()?;
    let training = args[5].boolean()?;
    if training {
        let channels = *input
            .get(1)
            .ok_or(ShapeError::IncorrectRank("input must have at least 2 dimensions"))?;
        return Ok(ShapeArg::Tuple(vec![
            ShapeArg::Ints(input.clone()),
            ShapeArg::Ints(vec![channels]),
            ShapeArg::Ints(vec![channels]),
        ]));
    }
    Ok(ShapeArg::Tuple(vec![
        ShapeArg::Ints(input),
        ShapeArg::Ints(vec![0]),
        ShapeArg::Ints(vec![0]),
    ]))
}

fn native_layer_norm_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let input = args[0].ints()?;
    let normalized = args[1].ints()?;
    if normalized.len() > input.len() {
        return Err(ShapeError::IncorrectRank(
            "normalized_shape has more dimensions than the input",
        ));
    }
    let unreduced = input.len() - normalized.len();
    let mut reduction: Vec<i64> = input[..unreduced].to_vec();
    reduction.extend(std::iter::repeat(1).take(normalized.len()));
    Ok(ShapeArg::Tuple(vec![
        ShapeArg::Ints(input),
        ShapeArg::Ints(reduction.clone()),
        ShapeArg::Ints(reduction),
    ]))
}

fn nll_loss_forward_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    let self_shape = args[0].ints()?;
    let target = args[1].ints()?;
    let weight = args[2].opt_ints()?;
    let reduction = args[3].int()?;

    let self_dim = self_shape.len();
    let target_dim = target.len();
    if self_dim == 0 || self_dim > 2 {
        return Err(ShapeError::IncorrectRank("input must be 1-D or 2-D"));
    }
    if target_dim > 1 {
        return Err(ShapeError::IncorrectRank("target must be 0-D or 1-D"));
    }
    let no_batch_dim = self_dim == 1 && target_dim == 0;
    if !no_batch_dim && (target.is_empty() || self_shape[0] != target[0]) {
        return Err(ShapeError::IncompatibleShapes("input and target batch sizes do not match"));
    }
    let n_classes = self_shape[self_dim - 1];
    if let Some(weight) = weight {
        if weight.len() != 1 || weight[0] != n_classes {
            return Err(ShapeError::IncompatibleShapes("weight size must match class count"));
        }
    }
    let scalar = ShapeArg::Ints(Vec::new());
    if reduction == 0 && self_dim == 2 {
        Ok(ShapeArg::Tuple(vec![ShapeArg::Ints(vec![self_shape[0]]), scalar]))
    } else {
        Ok(ShapeArg::Tuple(vec![scalar.clone(), scalar]))
    }
}

/// `nll_loss_backward` produces a gradient shaped like the input.
fn nll_loss_backward_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::unary(&args[1].ints()?)))
}

// Constructors.

fn arange_end_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::arange_end(args[0].float()?)?))
}

fn arange_start_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::arange_start(args[0].float()?, args[1].float()?)?))
}

fn arange_start_step_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    Ok(ShapeArg::Ints(fns::arange_start_step(
        args[0].float()?,
        args[1].float()?,
        args[2].float()?,
    )?))
}

/// `bincount` output length depends on the input values, which shape
/// computation cannot see; it has a known rank with an opaque size.
fn bincount_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    args[0].ints()?;
    Ok(ShapeArg::Ints(vec![fns::unknown_dim()]))
}

fn num_to_tensor_shape(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
    args[0].float()?;
    Ok(ShapeArg::Ints(Vec::new()))
}

/// Build the full rule catalog.
///
/// Registration order is the order rules are verified, checked and
/// compiled in.
pub fn catalog() -> Result<RuleCatalog, RuleError> {
    let mut rules = RuleCatalog::new();

    // Elementwise ops.
    rules.add("def aten〇tanh(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇erf(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇sigmoid(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇relu(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇sqrt(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇floor(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇ceil(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇log(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇abs(self: List[int]) -> List[int]:", same_shape)?;
    rules.add("def aten〇reciprocal(self: List[int]) -> List[int]:", same_shape)?;
    rules.add(
        "def aten〇contiguous(self: List[int], memory_format: int = 0) -> List[int]:",
        same_shape,
    )?;
    rules
        .add(
            "def aten〇gelu(self: List[int], approximate: str = \"none\") -> List[int]:",
            same_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3])])]);
    rules.add(
        "def aten〇hardtanh(self: List[int], min_val: float = -1, max_val: float = 1) -> List[int]:",
        same_shape,
    )?;
    rules.add(
        "def aten〇clamp(self: List[int], min: Optional[float] = None, max: Optional[float] = None) -> List[int]:",
        same_shape,
    )?;
    rules.add(
        "def aten〇dropout(input: List[int], p: float, train: bool) -> List[int]:",
        same_shape,
    )?;
    rules
        .add(
            "def aten〇softmax〇int(self: List[int], dim: int, dtype: Optional[int] = None) -> List[int]:",
            same_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3]), 1.into()])]);
    rules.add(
        "def aten〇log_softmax〇int(self: List[int], dim: int, dtype: Optional[int] = None) -> List[int]:",
        same_shape,
    )?;
    rules.add(
        "def aten〇add〇Scalar(self: List[int], other: float, alpha: float = 1) -> List[int]:",
        same_shape,
    )?;
    rules.add(
        "def aten〇sub〇Scalar(self: List[int], other: float, alpha: float = 1) -> List[int]:",
        same_shape,
    )?;
    rules.add(
        "def aten〇mul〇Scalar(self: List[int], other: float) -> List[int]:",
        same_shape,
    )?;
    rules.add(
        "def aten〇div〇Scalar(self: List[int], other: float) -> List[int]:",
        same_shape,
    )?;
    rules
        .add(
            "def aten〇eq〇Scalar(self: List[int], other: float) -> List[int]:",
            same_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3]), 1.0.into()])]);
    rules.add(
        "def aten〇gt〇Scalar(self: List[int], other: float) -> List[int]:",
        same_shape,
    )?;

    // Broadcasting binary ops.
    rules
        .add(
            "def aten〇add〇Tensor(self: List[int], other: List[int], alpha: float = 1) -> List[int]:",
            broadcast_pair,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), ts(&[2, 3])]), // Same shapes.
            Invocation::new(vec![ts(&[2, 3]), ts(&[3])]),    // Rank broadcasting.
            Invocation::new(vec![ts(&[2, 3]), ts(&[1, 3])]), // Size-1 broadcasting.
            Invocation::error(vec![ts(&[2, 3]), ts(&[4, 3])]), // Non-size-1 mismatch.
        ]);
    rules.add(
        "def aten〇sub〇Tensor(self: List[int], other: List[int], alpha: float = 1) -> List[int]:",
        broadcast_pair,
    )?;
    rules
        .add(
            "def aten〇mul〇Tensor(self: List[int], other: List[int]) -> List[int]:",
            broadcast_pair,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[4, 1]), ts(&[1, 5])])]);
    rules.add(
        "def aten〇div〇Tensor(self: List[int], other: List[int]) -> List[int]:",
        broadcast_pair,
    )?;
    rules.add(
        "def aten〇eq〇Tensor(self: List[int], other: List[int]) -> List[int]:",
        broadcast_pair,
    )?;
    rules.add(
        "def aten〇gt〇Tensor(self: List[int], other: List[int]) -> List[int]:",
        broadcast_pair,
    )?;
    rules.add(
        "def aten〇lt〇Tensor(self: List[int], other: List[int]) -> List[int]:",
        broadcast_pair,
    )?;
    rules.add(
        "def aten〇minimum(self: List[int], other: List[int]) -> List[int]:",
        broadcast_pair,
    )?;
    rules.add(
        "def aten〇maximum(self: List[int], other: List[int]) -> List[int]:",
        broadcast_pair,
    )?;
    rules.add(
        "def aten〇where〇self(condition: List[int], self: List[int], other: List[int]) -> List[int]:",
        broadcast_triple,
    )?;
    rules.add(
        "def aten〇lerp〇Tensor(self: List[int], end: List[int], weight: List[int]) -> List[int]:",
        broadcast_triple,
    )?;
    rules.add(
        "def aten〇addcmul(self: List[int], tensor1: List[int], tensor2: List[int], value: float = 1) -> List[int]:",
        broadcast_triple,
    )?;
    rules.add(
        "def aten〇addcdiv(self: List[int], tensor1: List[int], tensor2: List[int], value: float = 1) -> List[int]:",
        broadcast_triple,
    )?;

    // Matrix products.
    rules
        .add(
            "def aten〇matmul(self: List[int], other: List[int]) -> List[int]:",
            matmul_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[3]), ts(&[3])]),          // Dot product.
            Invocation::new(vec![ts(&[2, 3]), ts(&[3])]),       // Matrix-vector.
            Invocation::new(vec![ts(&[3]), ts(&[3, 4])]),       // Vector-matrix.
            Invocation::new(vec![ts(&[2, 3, 4]), ts(&[2, 4, 5])]), // Batched.
            Invocation::new(vec![ts(&[5, 2, 3]), ts(&[3, 4])]), // Broadcast batch.
            Invocation::error(vec![ts(&[2, 3]), ts(&[4, 5])]),  // Mismatched contraction.
        ]);
    rules
        .add(
            "def aten〇mm(self: List[int], mat2: List[int]) -> List[int]:",
            mm_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), ts(&[3, 4])]),
            Invocation::error(vec![ts(&[2, 3]), ts(&[4, 5])]), // Mismatched contraction.
            Invocation::error(vec![ts(&[2]), ts(&[2, 3])]),    // LHS is not a matrix.
        ]);
    rules
        .add(
            "def aten〇bmm(self: List[int], mat2: List[int]) -> List[int]:",
            bmm_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3, 4]), ts(&[2, 4, 5])]), // Basic case.
            Invocation::error(vec![ts(&[2, 3, 7]), ts(&[2, 4, 5])]), // Mismatched contracting dimension.
            Invocation::error(vec![ts(&[7, 3, 4]), ts(&[2, 4, 5])]), // Mismatched batch dimension.
            Invocation::error(vec![ts(&[7, 3]), ts(&[2, 4, 5])]),  // LHS is not rank 3.
            Invocation::error(vec![ts(&[2, 3, 4]), ts(&[2, 4])]),  // RHS is not rank 3.
        ]);
    rules
        .add(
            "def aten〇addmm(self: List[int], mat1: List[int], mat2: List[int], beta: float = 1, alpha: float = 1) -> List[int]:",
            addmm_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 4]), ts(&[2, 3]), ts(&[3, 4])]),
            Invocation::new(vec![ts(&[4]), ts(&[2, 3]), ts(&[3, 4])]), // Broadcast bias.
            Invocation::error(vec![ts(&[2, 4]), ts(&[2, 3]), ts(&[5, 4])]),
        ]);
    rules
        .add(
            "def aten〇linear(input: List[int], weight: List[int], bias: Optional[List[int]] = None) -> List[int]:",
            linear_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), ts(&[4, 3])]),
            Invocation::new(vec![ts(&[2, 3]), ts(&[4, 3]), ts(&[4])]),
            Invocation::error(vec![ts(&[2, 3]), ts(&[4, 5])]), // Mismatched features.
        ]);

    // Reductions.
    rules
        .add(
            "def aten〇sum(self: List[int], dtype: Optional[int] = None) -> List[int]:",
            scalar_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3])])]);
    rules.add(
        "def aten〇mean(self: List[int], dtype: Optional[int] = None) -> List[int]:",
        scalar_shape,
    )?;
    rules.add(
        "def aten〇var(self: List[int], unbiased: bool = True) -> List[int]:",
        scalar_shape,
    )?;
    rules
        .add("def aten〇max(self: List[int]) -> List[int]:", scalar_shape)?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3])])]);
    rules
        .add(
            "def aten〇argmax(self: List[int], dim: Optional[int] = None, keepdim: bool = False) -> List[int]:",
            argmax_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3, 4])]), // Basic case.
            Invocation::new(vec![ts(&[2, 3, 4])]).kwarg("dim", 0), // Explicit `dim`.
            Invocation::new(vec![ts(&[2, 3, 4])]).kwarg("dim", 0).kwarg("keepdim", true),
            Invocation::new(vec![ts(&[2, 3, 4])]).kwarg("dim", -3), // Negative `dim`.
            Invocation::new(vec![ts(&[2, 3, 4])]).kwarg("dim", 2),  // Maximum valid `dim`.
            Invocation::error(vec![ts(&[2, 3, 4])]).kwarg("dim", -4), // `dim` out of bounds.
            Invocation::error(vec![ts(&[2, 3, 4])]).kwarg("dim", 3),  // `dim` out of bounds.
        ]);
    rules
        .add(
            "def aten〇max〇dim(self: List[int], dim: int, keepdim: bool = False) -> Tuple[List[int], List[int]]:",
            max_dim_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), 1.into()]),
            Invocation::new(vec![ts(&[2, 3]), 1.into()]).kwarg("keepdim", true),
            Invocation::error(vec![ts(&[2, 3]), 2.into()]), // `dim` out of bounds.
        ]);
    rules.add(
        "def aten〇any〇dim(self: List[int], dim: int, keepdim: bool = False) -> List[int]:",
        reduce_dim_shape,
    )?;
    rules
        .add(
            "def aten〇sum〇dim_IntList(self: List[int], dim: List[int], keepdim: bool = False, dtype: Optional[int] = None) -> List[int]:",
            reduce_dim_list_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3, 4]), ints(&[1])]),
            Invocation::new(vec![ts(&[2, 3, 4]), ints(&[1])]).kwarg("keepdim", true),
            Invocation::error(vec![ts(&[2, 3, 4]), ints(&[3])]), // Axis out of bounds.
        ]);
    rules
        .add(
            "def aten〇mean〇dim(self: List[int], dim: List[int], keepdim: bool = False, dtype: Optional[int] = None) -> List[int]:",
            reduce_dim_list_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3, 4]), ints(&[1])]),
            Invocation::new(vec![ts(&[2, 3, 4]), ints(&[-1, 1])]), // Several axes.
        ]);
    rules
        .add(
            "def aten〇topk(self: List[int], k: int, dim: int = -1, largest: bool = True, sorted: bool = True) -> Tuple[List[int], List[int]]:",
            topk_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), 1.into()]), // Basic case.
            Invocation::new(vec![ts(&[2, 3]), 2.into()]).kwarg("dim", 0), // Explicit `dim`.
            Invocation::error(vec![ts(&[2, 3]), 10.into()]), // `k` too big.
            Invocation::error(vec![ts(&[2, 3]), 2.into()]).kwarg("dim", 100), // `dim` out of bounds.
        ]);

    // Layout ops.
    rules
        .add("def aten〇t(self: List[int]) -> List[int]:", t_shape)?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3])]),
            Invocation::error(vec![ts(&[2, 3, 4])]), // Rank > 2.
        ]);
    rules
        .add(
            "def aten〇transpose〇int(self: List[int], dim0: int, dim1: int) -> List[int]:",
            transpose_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3, 4]), 0.into(), 2.into()]),
            Invocation::new(vec![ts(&[2, 3, 4]), (-1).into(), (-2).into()]),
            Invocation::error(vec![ts(&[2, 3, 4]), 0.into(), 3.into()]),
        ]);
    rules
        .add(
            "def aten〇permute(self: List[int], dims: List[int]) -> List[int]:",
            permute_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3, 4]), ints(&[2, 0, 1])]),
            Invocation::error(vec![ts(&[2, 3, 4]), ints(&[0, 0, 1])]), // Repeated dim.
            Invocation::error(vec![ts(&[2, 3, 4]), ints(&[0, 1])]),    // Too few dims.
        ]);
    rules
        .add(
            "def aten〇unsqueeze(self: List[int], dim: int) -> List[int]:",
            unsqueeze_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), 0.into()]),
            Invocation::new(vec![ts(&[2, 3]), (-1).into()]),
            Invocation::error(vec![ts(&[2, 3]), 3.into()]),
        ]);
    rules.add("def aten〇squeeze(self: List[int]) -> List[int]:", squeeze_shape)?;
    rules
        .add(
            "def aten〇squeeze〇dim(self: List[int], dim: int) -> List[int]:",
            squeeze_dim_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[1, 3]), 0.into()]),
            Invocation::new(vec![ts(&[2, 3]), 0.into()]), // Dimension not squeezable.
            Invocation::new(vec![ts(&[1, 3]), (-2).into()]),
        ]);
    rules
        .add(
            "def aten〇flatten〇using_ints(self: List[int], start_dim: int = 0, end_dim: int = -1) -> List[int]:",
            flatten_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3, 4])]),
            Invocation::new(vec![ts(&[2, 3, 4]), 1.into()]),
            Invocation::error(vec![ts(&[2, 3, 4]), 2.into(), 1.into()]), // start after end.
        ]);
    rules
        .add(
            "def aten〇view(self: List[int], size: List[int]) -> List[int]:",
            view_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3, 4]), ints(&[6, 4])]),
            Invocation::new(vec![ts(&[2, 3, 4]), ints(&[-1, 4])]), // Inferred dimension.
            Invocation::error(vec![ts(&[2, 3, 4]), ints(&[5, 5])]),
        ]);
    rules.add(
        "def aten〇reshape(self: List[int], shape: List[int]) -> List[int]:",
        view_shape,
    )?;
    rules
        .add(
            "def aten〇expand(self: List[int], size: List[int], implicit: bool = False) -> List[int]:",
            expand_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[1, 3]), ints(&[4, 3])]),
            Invocation::new(vec![ts(&[3]), ints(&[2, 3])]), // Added leading dimension.
            Invocation::error(vec![ts(&[2, 3]), ints(&[4, 3])]),
        ]);
    rules.add(
        "def aten〇broadcast_to(self: List[int], size: List[int]) -> List[int]:",
        expand_shape,
    )?;
    rules
        .add(
            "def aten〇_shape_as_tensor(self: List[int]) -> List[int]:",
            shape_as_tensor_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[])]),
            Invocation::new(vec![ts(&[2, 3])]),
        ]);
    rules
        .add(
            "def aten〇cat(tensors: List[List[int]], dim: int = 0) -> List[int]:",
            cat_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![Arg::List(vec![ts(&[2, 3]), ts(&[4, 3])])]),
            Invocation::new(vec![Arg::List(vec![ts(&[2, 3]), ts(&[2, 5])])]).kwarg("dim", 1),
            Invocation::new(vec![Arg::List(vec![ts(&[2, 3]), ts(&[0])])]), // Legacy empty tensor.
            Invocation::error(vec![Arg::List(vec![ts(&[2, 3]), ts(&[2, 4])])]),
        ]);

    // Indexing ops.
    rules
        .add(
            "def aten〇slice〇Tensor(self: List[int], dim: int = 0, start: Optional[int] = None, end: Optional[int] = None, step: int = 1) -> List[int]:",
            slice_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[10])]),
            Invocation::new(vec![ts(&[10]), 0.into(), 2.into(), 8.into(), 2.into()]),
            Invocation::new(vec![ts(&[10])]).kwarg("start", -3),
            Invocation::error(vec![ts(&[10])]).kwarg("step", 0),
        ]);
    rules
        .add(
            "def aten〇select〇int(self: List[int], dim: int, index: int) -> List[int]:",
            select_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), 0.into(), 1.into()]),
            Invocation::new(vec![ts(&[2, 3]), 1.into(), (-1).into()]),
            Invocation::error(vec![ts(&[2, 3]), 0.into(), 3.into()]),
        ]);
    rules
        .add(
            "def aten〇index_select(self: List[int], dim: int, index: List[int]) -> List[int]:",
            index_select_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), 0.into(), lt(&[4])]),
            Invocation::error(vec![ts(&[2, 3]), 0.into(), lt(&[2, 2])]), // Index must be 1-D.
        ]);
    rules
        .add(
            "def aten〇gather(self: List[int], dim: int, index: List[int], sparse_grad: bool = False) -> List[int]:",
            gather_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3]), 1.into(), lt(&[2, 3])])]);
    rules
        .add(
            "def aten〇embedding(weight: List[int], indices: List[int], padding_idx: int = -1, scale_grad_by_freq: bool = False, sparse: bool = False) -> List[int]:",
            embedding_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[10, 4]), lt(&[2, 3])]),
            Invocation::error(vec![ts(&[10]), lt(&[2])]), // Weight must be 2-D.
        ]);
    rules
        .add(
            "def aten〇index〇Tensor(self: List[int], indices: List[Optional[List[int]]]) -> List[int]:",
            index_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2]), Arg::List(vec![lt(&[4])])]), // Basic case.
            Invocation::new(vec![ts(&[2, 3]), Arg::List(vec![lt(&[4]), lt(&[4])])]),
            Invocation::new(vec![ts(&[2, 3]), Arg::List(vec![lt(&[4]), lt(&[6, 4])])]),
            Invocation::new(vec![ts(&[2, 3]), Arg::List(vec![lt(&[4]), Arg::None])]), // Explicit None entry.
            Invocation::new(vec![
                ts(&[2, 3]),
                Arg::List(vec![lt(&[4, 5, 6]), lt(&[1, 5, 1])]),
            ]), // Broadcasting of index tensors.
            Invocation::new(vec![ts(&[2, 3]), Arg::List(vec![lt(&[4])])]), // Fewer indices than dimensions.
            Invocation::error(vec![
                ts(&[2, 3]),
                Arg::List(vec![lt(&[4]), lt(&[4]), lt(&[4])]),
            ]), // More indices than dimensions.
        ]);
    rules
        .add(
            "def aten〇constant_pad_nd(self: List[int], pad: List[int], value: float = 0) -> List[int]:",
            pad_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2]), ints(&[1, 2])]), // Basic case.
            Invocation::new(vec![ts(&[2, 3]), ints(&[1, 2, 3, 4])]), // More dimensions.
            Invocation::new(vec![ts(&[2, 3, 4]), ints(&[1, 2, 3, 4])]), // Partial padding.
            Invocation::error(vec![ts(&[2]), ints(&[1, 2, 3, 4])]), // Too many pad values.
            Invocation::error(vec![ts(&[2]), ints(&[1])]),          // Unpaired pad value.
        ]);

    // Neural-network ops.
    rules
        .add(
            "def aten〇conv2d(input: List[int], weight: List[int], bias: Optional[List[int]] = None, stride: List[int] = (1, 1), padding: List[int] = (0, 0), dilation: List[int] = (1, 1), groups: int = 1) -> List[int]:",
            conv2d_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[1, 3, 8, 8]), ts(&[16, 3, 1, 1])]),
            Invocation::new(vec![ts(&[2, 3, 9, 9]), ts(&[8, 3, 3, 3]), ts(&[8])])
                .kwarg("stride", ints(&[2, 2])),
            Invocation::error(vec![ts(&[1, 4, 8, 8]), ts(&[16, 3, 1, 1])]), // Channel mismatch.
        ]);
    rules
        .add(
            "def aten〇max_pool2d(self: List[int], kernel_size: List[int], stride: List[int] = (), padding: List[int] = (0, 0), dilation: List[int] = (1, 1), ceil_mode: bool = False) -> List[int]:",
            max_pool2d_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[1, 3, 8, 8]), ints(&[2, 2])]), // Stride defaults to the kernel.
            Invocation::new(vec![ts(&[3, 7, 7]), ints(&[2, 2])]).kwarg("stride", ints(&[2, 2])),
            Invocation::new(vec![ts(&[3, 7, 7]), ints(&[2, 2])])
                .kwarg("stride", ints(&[2, 2]))
                .kwarg("ceil_mode", true),
            Invocation::error(vec![ts(&[3, 7]), ints(&[2, 2])]), // Rank too low.
        ]);
    rules
        .add(
            "def aten〇adaptive_avg_pool2d(self: List[int], output_size: List[int]) -> List[int]:",
            adaptive_pool_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[1, 3, 8, 8]), ints(&[2, 2])]),
            Invocation::new(vec![ts(&[3, 8, 8]), ints(&[1, 1])]),
            Invocation::error(vec![ts(&[1, 3, 8, 8]), ints(&[2, 2, 2])]),
        ]);
    rules
        .add(
            "def aten〇batch_norm(input: List[int], weight: Optional[List[int]], bias: Optional[List[int]], running_mean: Optional[List[int]], running_var: Optional[List[int]], training: bool, momentum: float, eps: float, cudnn_enabled: bool) -> List[int]:",
            same_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![
            ts(&[2, 3]),
            Arg::None,
            Arg::None,
            Arg::None,
            Arg::None,
            true.into(),
            0.1.into(),
            (1e-5).into(),
            true.into(),
        ])]);
    rules
        .add(
            "def aten〇native_batch_norm(input: List[int], weight: Optional[List[int]], bias: Optional[List[int]], running_mean: Optional[List[int]], running_var: Optional[List[int]], training: bool, momentum: float, eps: float) -> Tuple[List[int], List[int], List[int]]:",
            native_batch_norm_shape,
        )?
        .with_invocations(vec![
            // Training.
            Invocation::new(vec![
                ts(&[2, 3]),
                Arg::None,
                Arg::None,
                Arg::None,
                Arg::None,
                true.into(),
                (1e-4).into(),
                (1e-6).into(),
            ]),
            // Inference with running stats.
            Invocation::new(vec![
                ts(&[2, 3]),
                Arg::None,
                Arg::None,
                ts(&[3]),
                ts(&[3]),
                false.into(),
                (1e-4).into(),
                (1e-6).into(),
            ]),
            // Training, high-dimensional.
            Invocation::new(vec![
                ts(&[2, 3, 4, 5, 6]),
                Arg::None,
                Arg::None,
                Arg::None,
                Arg::None,
                true.into(),
                (1e-4).into(),
                (1e-6).into(),
            ]),
            // Dimensionality too low.
            Invocation::error(vec![
                ts(&[2]),
                Arg::None,
                Arg::None,
                Arg::None,
                Arg::None,
                true.into(),
                (1e-4).into(),
                (1e-6).into(),
            ]),
        ]);
    rules
        .add(
            "def aten〇native_layer_norm(input: List[int], normalized_shape: List[int], weight: Optional[List[int]], bias: Optional[List[int]], eps: float) -> Tuple[List[int], List[int], List[int]]:",
            native_layer_norm_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![
            ts(&[2, 5, 2, 2, 3]),
            ints(&[2, 2, 3]),
            Arg::None,
            Arg::None,
            (1e-6).into(),
        ])]);
    rules
        .add(
            "def aten〇layer_norm(input: List[int], normalized_shape: List[int], weight: Optional[List[int]] = None, bias: Optional[List[int]] = None, eps: float = 1.0000000000000001e-05, cudnn_enable: bool = True) -> List[int]:",
            same_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3]), ints(&[3])])]);
    rules
        .add(
            "def aten〇nll_loss_forward(self: List[int], target: List[int], weight: Optional[List[int]], reduction: int, ignore_index: int) -> Tuple[List[int], List[int]]:",
            nll_loss_forward_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![ts(&[2, 3]), lt(&[2]), Arg::None, 1.into(), (-100).into()]), // Basic case.
            Invocation::new(vec![ts(&[3]), lt(&[]), Arg::None, 1.into(), (-100).into()]), // No batch dim.
            Invocation::new(vec![ts(&[2, 3]), lt(&[2]), Arg::None, 0.into(), (-100).into()]), // No reduction.
            Invocation::error(vec![ts(&[2, 3]), lt(&[7]), Arg::None, 1.into(), (-100).into()]), // Mismatched batch.
        ]);
    rules.add(
        "def aten〇nll_loss_backward(grad_output: List[int], self: List[int], target: List[int], weight: Optional[List[int]], reduction: int, ignore_index: int, total_weight: List[int]) -> List[int]:",
        nll_loss_backward_shape,
    )?;

    // Tensor constructors.
    rules
        .add(
            "def aten〇zeros(size: List[int], dtype: Optional[int] = None) -> List[int]:",
            identity_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ints(&[2, 3])])]);
    rules.add(
        "def aten〇ones(size: List[int], dtype: Optional[int] = None) -> List[int]:",
        identity_shape,
    )?;
    rules
        .add(
            "def aten〇full(size: List[int], fill_value: float, dtype: Optional[int] = None) -> List[int]:",
            identity_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ints(&[2, 3]), 5.0.into()])]);
    rules.add(
        "def aten〇empty〇memory_format(size: List[int], dtype: Optional[int] = None, memory_format: Optional[int] = None) -> List[int]:",
        identity_shape,
    )?;
    rules
        .add(
            "def aten〇zeros_like(self: List[int], dtype: Optional[int] = None, memory_format: Optional[int] = None) -> List[int]:",
            same_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3])])]);
    rules.add(
        "def aten〇ones_like(self: List[int], dtype: Optional[int] = None, memory_format: Optional[int] = None) -> List[int]:",
        same_shape,
    )?;
    rules.add(
        "def aten〇full_like(self: List[int], fill_value: float, dtype: Optional[int] = None, memory_format: Optional[int] = None) -> List[int]:",
        same_shape,
    )?;
    rules
        .add(
            "def aten〇new_zeros(self: List[int], size: List[int], dtype: Optional[int] = None) -> List[int]:",
            new_size_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3]), ints(&[4])])]);
    rules.add(
        "def aten〇new_ones(self: List[int], size: List[int], dtype: Optional[int] = None) -> List[int]:",
        new_size_shape,
    )?;
    rules
        .add(
            "def aten〇bernoulli(self: List[int], generator: Any = None) -> List[int]:",
            identity_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![ts(&[2, 3])])]);
    rules
        .add(
            "def aten〇arange(end: float, dtype: Optional[int] = None) -> List[int]:",
            arange_end_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![5.0.into()]),
            Invocation::new(vec![2.5.into()]), // Fractional end rounds up.
            Invocation::error(vec![(-1.0).into()]),
        ]);
    rules.add(
        "def aten〇arange〇start(start: float, end: float, dtype: Optional[int] = None) -> List[int]:",
        arange_start_shape,
    )?;
    rules
        .add(
            "def aten〇arange〇start_step(start: float, end: float, step: float, dtype: Optional[int] = None) -> List[int]:",
            arange_start_step_shape,
        )?
        .with_invocations(vec![
            Invocation::new(vec![1.0.into(), 7.0.into(), 2.0.into()]),
            Invocation::new(vec![7.0.into(), 1.0.into(), (-2.0).into()]), // Negative step.
            Invocation::error(vec![1.0.into(), 7.0.into(), 0.0.into()]),  // Zero step.
        ]);
    rules.add(
        "def aten〇bincount(self: List[int], weights: Optional[List[int]] = None, minlength: int = 0) -> List[int]:",
        bincount_shape,
    )?;
    rules
        .add(
            "def prim〇NumToTensor〇Scalar(a: float) -> List[int]:",
            num_to_tensor_shape,
        )?
        .with_invocations(vec![Invocation::new(vec![5.0.into()])]);

    // Rules for operators kept for pass consistency but not present in the
    // canonical registry.
    rules
        .add(
            "def aten〇fill〇Scalar(self: List[int], value: float) -> List[int]:",
            identity_shape,
        )?
        .not_in_registry();
    rules
        .add(
            "def aten〇uniform(self: List[int], from_: float = 0., to: float = 1., generator: Any = None) -> List[int]:",
            identity_shape,
        )?
        .not_in_registry();

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use crate::args::ShapeArg;
    use crate::signature::Signature;

    use super::catalog;

    #[test]
    fn test_catalog_builds() {
        let rules = catalog().unwrap();
        assert!(rules.len() > 90);
        assert_eq!(
            rules.rules().iter().filter(|rule| rule.is_exempt()).count(),
            2
        );
    }

    #[test]
    fn test_def_lines_are_canonical() {
        // Every `def` line must be in the canonical rendering, since the
        // registry's expected signature is produced by rendering.
        let rules = catalog().unwrap();
        for rule in rules.rules() {
            let line = rule.def_line();
            let reparsed = Signature::parse(line).unwrap();
            assert_eq!(reparsed.render(), line, "non-canonical def line for {}", rule.name());
        }
    }

    #[test]
    fn test_rule_bodies_compute_shapes() {
        let rules = catalog().unwrap();

        let bmm = rules.get("aten〇bmm").unwrap();
        let mut args = vec![
            ShapeArg::Ints(vec![2, 3, 4]),
            ShapeArg::Ints(vec![2, 4, 5]),
        ];
        let result = bmm.run(&mut args).unwrap();
        assert_eq!(result, ShapeArg::Ints(vec![2, 3, 5]));

        let topk = rules.get("aten〇topk").unwrap();
        let mut args = vec![
            ShapeArg::Ints(vec![2, 3]),
            ShapeArg::Int(1),
            ShapeArg::Int(-1),
            ShapeArg::Bool(true),
            ShapeArg::Bool(true),
        ];
        let result = topk.run(&mut args).unwrap();
        assert_eq!(
            result,
            ShapeArg::Tuple(vec![ShapeArg::Ints(vec![2, 1]), ShapeArg::Ints(vec![2, 1])])
        );

        let mut args = vec![
            ShapeArg::Ints(vec![2, 3]),
            ShapeArg::Int(10),
            ShapeArg::Int(-1),
            ShapeArg::Bool(true),
            ShapeArg::Bool(true),
        ];
        assert!(topk.run(&mut args).is_err());
    }

    #[test]
    fn test_every_rule_name_is_operator_keyed() {
        let rules = catalog().unwrap();
        for rule in rules.rules() {
            assert!(!rule.key().ns.is_empty());
            assert!(!rule.key().name.is_empty());
        }
    }
}
