//! Symbolic invocation arguments and their shape/value projections.
//!
//! A rule is tested by invoking it side by side with the real operator. The
//! two sides take different argument types: the rule computes over dimension
//! lists, while the operator needs materialized tensors. [`Arg`] is the
//! symbolic form of an argument that can be projected into either world:
//! [`TensorOfShape`] leaves become fresh dimension lists in the shape domain
//! and all-ones tensors in the value domain, and every other node maps to
//! itself, so the two projections of one invocation are structurally
//! identical.

use std::fmt;

use shapegen_tensor::Tensor;

use crate::ops::OpError;
use crate::shape_fns::ShapeError;

/// Element type carried by a [`TensorOfShape`] placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    F32,
    I64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::I64 => write!(f, "i64"),
        }
    }
}

/// Symbolic placeholder for a tensor argument to an operator.
///
/// Rules take tensor arguments as `List[int]` while the real operators take
/// tensors, so invocations need a symbolic stand-in that can drive both. A
/// plain list does not work here: plain integer lists are themselves legal
/// arguments to a rule (eg. conv dilations) and must not be treated as
/// tensors.
///
/// The placeholder also carries an element type, since some operators
/// require a specific one (eg. index tensors).
#[derive(Clone, PartialEq, Eq)]
pub struct TensorOfShape {
    pub shape: Vec<usize>,
    pub dtype: DType,
}

impl TensorOfShape {
    /// Create a placeholder for a single-precision float tensor.
    pub fn new(shape: impl Into<Vec<usize>>) -> TensorOfShape {
        TensorOfShape {
            shape: shape.into(),
            dtype: DType::F32,
        }
    }

    /// Create a placeholder with an explicit element type.
    pub fn with_dtype(shape: impl Into<Vec<usize>>, dtype: DType) -> TensorOfShape {
        TensorOfShape {
            shape: shape.into(),
            dtype,
        }
    }

    /// Materialize the reference tensor this placeholder stands for.
    ///
    /// The fill value is a canonical constant (one), so the oracle behaves
    /// deterministically across runs.
    pub fn materialize(&self) -> Value {
        match self.dtype {
            DType::F32 => Value::Float(Tensor::<f32>::ones(self.shape.clone())),
            DType::I64 => Value::Int(Tensor::<i64>::ones(self.shape.clone())),
        }
    }
}

/// Shorthand for an integer-typed [`TensorOfShape`], the common case for
/// index arguments.
pub fn long_tensor(shape: impl Into<Vec<usize>>) -> TensorOfShape {
    TensorOfShape::with_dtype(shape, DType::I64)
}

impl fmt::Display for TensorOfShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorOfShape(")?;
        for (i, size) in self.shape.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", size)?;
        }
        if self.dtype != DType::F32 {
            if !self.shape.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "dtype={}", self.dtype)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for TensorOfShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A symbolic argument in an invocation: a tagged tree over placeholders,
/// literals, containers and the null value.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Tensor(TensorOfShape),
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<Arg>),
    Tuple(Vec<Arg>),
    None,
}

impl From<TensorOfShape> for Arg {
    fn from(tensor: TensorOfShape) -> Arg {
        Arg::Tensor(tensor)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Arg {
        Arg::Int(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Arg {
        Arg::Float(value)
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Arg {
        Arg::Bool(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Arg {
        Arg::Str(value.to_string())
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(items: Vec<Arg>) -> Arg {
        Arg::List(items)
    }
}

impl From<Vec<i64>> for Arg {
    fn from(items: Vec<i64>) -> Arg {
        Arg::List(items.into_iter().map(Arg::Int).collect())
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Arg]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Tensor(tensor) => write!(f, "{}", tensor),
            Arg::Int(value) => write!(f, "{}", value),
            Arg::Float(value) => write!(f, "{}", value),
            Arg::Bool(true) => write!(f, "True"),
            Arg::Bool(false) => write!(f, "False"),
            Arg::Str(value) => write!(f, "{:?}", value),
            Arg::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Arg::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Arg::None => write!(f, "None"),
        }
    }
}

/// A single operator invocation: the positional and keyword arguments to
/// drive one side-by-side execution of a rule and its operator, plus whether
/// the invocation is expected to fail.
///
/// Error invocations require *both* sides to fail. Knowing an invocation is
/// expected to fail avoids the failure mode where independent bugs make the
/// rule and the operator spuriously agree that an input must be rejected.
#[derive(Clone, PartialEq)]
pub struct Invocation {
    pub args: Vec<Arg>,
    pub kwargs: Vec<(&'static str, Arg)>,
    pub expect_failure: bool,
}

impl Invocation {
    /// An invocation expected to succeed on both sides.
    pub fn new(args: Vec<Arg>) -> Invocation {
        Invocation {
            args,
            kwargs: Vec::new(),
            expect_failure: false,
        }
    }

    /// An invocation expected to fail on both sides.
    pub fn error(args: Vec<Arg>) -> Invocation {
        Invocation {
            args,
            kwargs: Vec::new(),
            expect_failure: true,
        }
    }

    /// Add a keyword argument.
    pub fn kwarg(mut self, name: &'static str, value: impl Into<Arg>) -> Invocation {
        self.kwargs.push((name, value.into()));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expect_failure {
            write!(f, "ErrorInvocation(")?;
        } else {
            write!(f, "Invocation(")?;
        }
        let mut first = true;
        for arg in &self.args {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}", arg)?;
        }
        for (name, value) in &self.kwargs {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A materialized reference value produced or consumed by the oracle.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Float(Tensor<f32>),
    Int(Tensor<i64>),
}

impl Value {
    pub fn shape(&self) -> &[usize] {
        match self {
            Value::Float(tensor) => tensor.shape(),
            Value::Int(tensor) => tensor.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn as_int(&self) -> Option<&Tensor<i64>> {
        match self {
            Value::Int(tensor) => Some(tensor),
            Value::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<&Tensor<f32>> {
        match self {
            Value::Float(tensor) => Some(tensor),
            Value::Int(_) => None,
        }
    }
}

/// Shape-domain projection of an [`Arg`].
///
/// Tensor placeholders become integer dimension lists. A literal list whose
/// elements are all integers also becomes [`ShapeArg::Ints`]: in the shape
/// domain a tensor shape and a plain integer list are the same kind of
/// value, and rules receive both through the same accessor.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeArg {
    Ints(Vec<i64>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<ShapeArg>),
    Tuple(Vec<ShapeArg>),
    None,
}

/// Value-domain projection of an [`Arg`]. Structurally identical to the
/// shape-domain projection except that tensor placeholders are materialized.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueArg {
    Tensor(Value),
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Ints(Vec<i64>),
    List(Vec<ValueArg>),
    Tuple(Vec<ValueArg>),
    None,
}

fn collapse_int_list(items: &[Arg]) -> Option<Vec<i64>> {
    items
        .iter()
        .map(|item| match item {
            Arg::Int(value) => Some(*value),
            _ => None,
        })
        .collect()
}

impl Arg {
    /// Project this argument into the shape domain.
    ///
    /// Every projection of a tensor placeholder allocates a fresh dimension
    /// list. Rule bodies are allowed to mutate their shape arguments in
    /// place, because in the consuming compiler every shape list is produced
    /// by a fresh size query that allocates a new, unaliased list.
    pub fn to_shape_arg(&self) -> ShapeArg {
        match self {
            Arg::Tensor(tensor) => {
                ShapeArg::Ints(tensor.shape.iter().map(|&size| size as i64).collect())
            }
            Arg::Int(value) => ShapeArg::Int(*value),
            Arg::Float(value) => ShapeArg::Float(*value),
            Arg::Bool(value) => ShapeArg::Bool(*value),
            Arg::Str(value) => ShapeArg::Str(value.clone()),
            Arg::List(items) => match collapse_int_list(items) {
                Some(ints) => ShapeArg::Ints(ints),
                None => ShapeArg::List(items.iter().map(Arg::to_shape_arg).collect()),
            },
            Arg::Tuple(items) => ShapeArg::Tuple(items.iter().map(Arg::to_shape_arg).collect()),
            Arg::None => ShapeArg::None,
        }
    }

    /// Project this argument into the value domain.
    pub fn to_value_arg(&self) -> ValueArg {
        match self {
            Arg::Tensor(tensor) => ValueArg::Tensor(tensor.materialize()),
            Arg::Int(value) => ValueArg::Int(*value),
            Arg::Float(value) => ValueArg::Float(*value),
            Arg::Bool(value) => ValueArg::Bool(*value),
            Arg::Str(value) => ValueArg::Str(value.clone()),
            Arg::List(items) => match collapse_int_list(items) {
                Some(ints) => ValueArg::Ints(ints),
                None => ValueArg::List(items.iter().map(Arg::to_value_arg).collect()),
            },
            Arg::Tuple(items) => ValueArg::Tuple(items.iter().map(Arg::to_value_arg).collect()),
            Arg::None => ValueArg::None,
        }
    }
}

impl ShapeArg {
    /// Read this argument as an integer list (a shape or a literal list).
    pub fn ints(&self) -> Result<Vec<i64>, ShapeError> {
        match self {
            ShapeArg::Ints(values) => Ok(values.clone()),
            ShapeArg::Tuple(items) | ShapeArg::List(items) => items
                .iter()
                .map(|item| match item {
                    ShapeArg::Int(value) => Ok(*value),
                    _ => Err(ShapeError::ArgType("expected a list of ints")),
                })
                .collect(),
            _ => Err(ShapeError::ArgType("expected a list of ints")),
        }
    }

    /// Read this argument as a mutable integer list for in-place shape
    /// computation.
    pub fn ints_mut(&mut self) -> Result<&mut Vec<i64>, ShapeError> {
        match self {
            ShapeArg::Ints(values) => Ok(values),
            _ => Err(ShapeError::ArgType("expected a list of ints")),
        }
    }

    pub fn int(&self) -> Result<i64, ShapeError> {
        match self {
            ShapeArg::Int(value) => Ok(*value),
            _ => Err(ShapeError::ArgType("expected an int")),
        }
    }

    pub fn opt_int(&self) -> Result<Option<i64>, ShapeError> {
        match self {
            ShapeArg::None => Ok(None),
            _ => Ok(Some(self.int()?)),
        }
    }

    /// Read this argument as a float. Integer literals are accepted where a
    /// float is expected.
    pub fn float(&self) -> Result<f64, ShapeError> {
        match self {
            ShapeArg::Float(value) => Ok(*value),
            ShapeArg::Int(value) => Ok(*value as f64),
            _ => Err(ShapeError::ArgType("expected a float")),
        }
    }

    pub fn opt_float(&self) -> Result<Option<f64>, ShapeError> {
        match self {
            ShapeArg::None => Ok(None),
            _ => Ok(Some(self.float()?)),
        }
    }

    pub fn boolean(&self) -> Result<bool, ShapeError> {
        match self {
            ShapeArg::Bool(value) => Ok(*value),
            _ => Err(ShapeError::ArgType("expected a bool")),
        }
    }

    pub fn string(&self) -> Result<&str, ShapeError> {
        match self {
            ShapeArg::Str(value) => Ok(value),
            _ => Err(ShapeError::ArgType("expected a string")),
        }
    }

    pub fn opt_ints(&self) -> Result<Option<Vec<i64>>, ShapeError> {
        match self {
            ShapeArg::None => Ok(None),
            _ => Ok(Some(self.ints()?)),
        }
    }

    /// Read this argument as a list of shapes (`List[List[int]]`).
    pub fn shape_list(&self) -> Result<Vec<Vec<i64>>, ShapeError> {
        match self {
            ShapeArg::List(items) => items.iter().map(ShapeArg::ints).collect(),
            // An empty literal list collapses to an empty integer list
            // during projection.
            ShapeArg::Ints(values) if values.is_empty() => Ok(Vec::new()),
            _ => Err(ShapeError::ArgType("expected a list of int lists")),
        }
    }

    /// Read this argument as a list of optional shapes
    /// (`List[Optional[List[int]]]`).
    pub fn opt_shape_list(&self) -> Result<Vec<Option<Vec<i64>>>, ShapeError> {
        match self {
            ShapeArg::List(items) => items
                .iter()
                .map(|item| match item {
                    ShapeArg::None => Ok(None),
                    _ => Ok(Some(item.ints()?)),
                })
                .collect(),
            ShapeArg::Ints(values) if values.is_empty() => Ok(Vec::new()),
            _ => Err(ShapeError::ArgType("expected a list of optional int lists")),
        }
    }
}

impl ValueArg {
    pub fn tensor(&self) -> Result<&Value, OpError> {
        match self {
            ValueArg::Tensor(value) => Ok(value),
            _ => Err(OpError::InputType("expected a tensor")),
        }
    }

    pub fn opt_tensor(&self) -> Result<Option<&Value>, OpError> {
        match self {
            ValueArg::None => Ok(None),
            _ => Ok(Some(self.tensor()?)),
        }
    }

    pub fn int(&self) -> Result<i64, OpError> {
        match self {
            ValueArg::Int(value) => Ok(*value),
            _ => Err(OpError::InputType("expected an int")),
        }
    }

    pub fn opt_int(&self) -> Result<Option<i64>, OpError> {
        match self {
            ValueArg::None => Ok(None),
            _ => Ok(Some(self.int()?)),
        }
    }

    /// Read this argument as a float. Integer literals are accepted where a
    /// float is expected.
    pub fn float(&self) -> Result<f64, OpError> {
        match self {
            ValueArg::Float(value) => Ok(*value),
            ValueArg::Int(value) => Ok(*value as f64),
            _ => Err(OpError::InputType("expected a float")),
        }
    }

    pub fn opt_float(&self) -> Result<Option<f64>, OpError> {
        match self {
            ValueArg::None => Ok(None),
            _ => Ok(Some(self.float()?)),
        }
    }

    pub fn boolean(&self) -> Result<bool, OpError> {
        match self {
            ValueArg::Bool(value) => Ok(*value),
            _ => Err(OpError::InputType("expected a bool")),
        }
    }

    pub fn string(&self) -> Result<&str, OpError> {
        match self {
            ValueArg::Str(value) => Ok(value),
            _ => Err(OpError::InputType("expected a string")),
        }
    }

    pub fn ints(&self) -> Result<Vec<i64>, OpError> {
        match self {
            ValueArg::Ints(values) => Ok(values.clone()),
            ValueArg::Tuple(items) | ValueArg::List(items) => items
                .iter()
                .map(|item| match item {
                    ValueArg::Int(value) => Ok(*value),
                    _ => Err(OpError::InputType("expected a list of ints")),
                })
                .collect(),
            _ => Err(OpError::InputType("expected a list of ints")),
        }
    }

    pub fn opt_ints(&self) -> Result<Option<Vec<i64>>, OpError> {
        match self {
            ValueArg::None => Ok(None),
            _ => Ok(Some(self.ints()?)),
        }
    }

    /// Read this argument as a list of tensors.
    pub fn tensors(&self) -> Result<Vec<&Value>, OpError> {
        match self {
            ValueArg::List(items) => items.iter().map(ValueArg::tensor).collect(),
            ValueArg::Ints(values) if values.is_empty() => Ok(Vec::new()),
            _ => Err(OpError::InputType("expected a list of tensors")),
        }
    }

    /// Read this argument as a list of optional tensors.
    pub fn opt_tensors(&self) -> Result<Vec<Option<&Value>>, OpError> {
        match self {
            ValueArg::List(items) => items
                .iter()
                .map(|item| match item {
                    ValueArg::None => Ok(None),
                    _ => Ok(Some(item.tensor()?)),
                })
                .collect(),
            ValueArg::Ints(values) if values.is_empty() => Ok(Vec::new()),
            _ => Err(OpError::InputType("expected a list of optional tensors")),
        }
    }
}

/// Normalize a rule body's result into a flat list of shapes.
///
/// Rules return either a single shape or a tuple of shapes; the verifier
/// wants one list with N entries for N operator results. A bare integer list
/// counts as a single shape, since that is what a shape-domain result looks
/// like.
pub fn normalize_result(result: ShapeArg) -> Result<Vec<Vec<i64>>, ShapeError> {
    match result {
        ShapeArg::Ints(values) => Ok(vec![values]),
        ShapeArg::List(items) => {
            // A list result must itself be a shape, ie. a list of ints.
            let shape = items
                .iter()
                .map(|item| match item {
                    ShapeArg::Int(value) => Ok(*value),
                    _ => Err(ShapeError::InvalidValue("unexpected shape function result")),
                })
                .collect::<Result<Vec<i64>, _>>()?;
            Ok(vec![shape])
        }
        ShapeArg::Tuple(items) => items
            .into_iter()
            .map(|item| match item {
                ShapeArg::Ints(values) => Ok(values),
                _ => Err(ShapeError::InvalidValue("unexpected shape function result")),
            })
            .collect(),
        _ => Err(ShapeError::InvalidValue("unexpected shape function result")),
    }
}

#[cfg(test)]
mod tests {
    use shapegen_testing::TestCases;

    use super::{long_tensor, normalize_result, Arg, DType, Invocation, ShapeArg, TensorOfShape, ValueArg};

    #[test]
    fn test_display_round_trips_constructor_form() {
        #[derive(Debug)]
        struct Case {
            arg: Arg,
            expected: &'static str,
        }

        let cases = [
            Case {
                arg: Arg::Tensor(TensorOfShape::new([2, 3])),
                expected: "TensorOfShape(2, 3)",
            },
            Case {
                arg: Arg::Tensor(TensorOfShape::new([])),
                expected: "TensorOfShape()",
            },
            Case {
                arg: Arg::Tensor(long_tensor([4])),
                expected: "TensorOfShape(4, dtype=i64)",
            },
            Case {
                arg: Arg::List(vec![Arg::Int(1), Arg::Int(2)]),
                expected: "[1, 2]",
            },
            Case {
                arg: Arg::Tuple(vec![Arg::Int(1)]),
                expected: "(1,)",
            },
            Case {
                arg: Arg::Bool(true),
                expected: "True",
            },
            Case {
                arg: Arg::None,
                expected: "None",
            },
        ];

        cases.test_each(|case| {
            assert_eq!(case.arg.to_string(), case.expected);
        });
    }

    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new(vec![Arg::Tensor(TensorOfShape::new([2, 3])), Arg::Int(1)])
            .kwarg("dim", 0);
        assert_eq!(
            invocation.to_string(),
            "Invocation(TensorOfShape(2, 3), 1, dim=0)"
        );

        let invocation = Invocation::error(vec![Arg::Tensor(TensorOfShape::new([2, 3]))]);
        assert_eq!(invocation.to_string(), "ErrorInvocation(TensorOfShape(2, 3))");
    }

    #[test]
    fn test_projections_mirror_structure() {
        let arg = Arg::List(vec![
            Arg::Tensor(long_tensor([4])),
            Arg::None,
            Arg::Tuple(vec![Arg::Int(1), Arg::Bool(false)]),
        ]);

        let shape = arg.to_shape_arg();
        assert_eq!(
            shape,
            ShapeArg::List(vec![
                ShapeArg::Ints(vec![4]),
                ShapeArg::None,
                ShapeArg::Tuple(vec![ShapeArg::Int(1), ShapeArg::Bool(false)]),
            ])
        );

        let value = arg.to_value_arg();
        let ValueArg::List(items) = &value else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].tensor().unwrap().shape(), &[4]);
        assert_eq!(items[1], ValueArg::None);
    }

    #[test]
    fn test_int_list_collapses_in_both_domains() {
        let arg = Arg::List(vec![Arg::Int(2), Arg::Int(3)]);
        assert_eq!(arg.to_shape_arg(), ShapeArg::Ints(vec![2, 3]));
        assert_eq!(arg.to_value_arg(), ValueArg::Ints(vec![2, 3]));
    }

    #[test]
    fn test_shape_projection_is_fresh() {
        let arg = Arg::Tensor(TensorOfShape::new([2, 3]));
        let mut first = arg.to_shape_arg();
        first.ints_mut().unwrap()[0] = 99;
        assert_eq!(arg.to_shape_arg(), ShapeArg::Ints(vec![2, 3]));
    }

    #[test]
    fn test_materialize_dtype() {
        let value = TensorOfShape::new([2, 2]).materialize();
        assert!(value.as_float().is_some());
        assert_eq!(value.shape(), &[2, 2]);

        let value = long_tensor([3]).materialize();
        let tensor = value.as_int().unwrap();
        assert!(tensor.data().iter().all(|&x| x == 1));
    }

    #[test]
    fn test_typed_accessors_reject_wrong_kinds() {
        assert!(ShapeArg::Int(1).ints().is_err());
        assert!(ShapeArg::Ints(vec![1]).int().is_err());
        assert!(ShapeArg::Float(1.).boolean().is_err());
        assert_eq!(ShapeArg::Int(2).float(), Ok(2.));
        assert_eq!(ShapeArg::None.opt_int(), Ok(None));
        assert_eq!(ShapeArg::Tuple(vec![ShapeArg::Int(1), ShapeArg::Int(1)]).ints(), Ok(vec![1, 1]));
    }

    #[test]
    fn test_normalize_result() {
        assert_eq!(normalize_result(ShapeArg::Ints(vec![2, 3])), Ok(vec![vec![2, 3]]));
        assert_eq!(
            normalize_result(ShapeArg::Tuple(vec![
                ShapeArg::Ints(vec![2]),
                ShapeArg::Ints(vec![3]),
            ])),
            Ok(vec![vec![2], vec![3]])
        );
        assert!(normalize_result(ShapeArg::Int(1)).is_err());
        assert!(normalize_result(ShapeArg::Tuple(vec![ShapeArg::Int(1)])).is_err());
    }

    #[test]
    fn test_dtype_display() {
        assert_eq!(DType::F32.to_string(), "f32");
        assert_eq!(DType::I64.to_string(), "i64");
    }
}
