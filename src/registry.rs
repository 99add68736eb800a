//! Operator registry adapter.
//!
//! The canonical operator catalog lives in a persisted JSON description
//! embedded in the crate. Loading it yields an [`OpDescriptor`] per
//! operator, keyed by `(namespace, name, overload)` triple, together with a
//! reference-operator binding for the verification oracle.
//!
//! Descriptors know the operator's schema types (tensors, scalars, lists)
//! and can render the exact `def` line a conforming rule must declare:
//! tensor parameters become `List[int]`, scalars become `float`, and
//! default-value literals are spliced in verbatim. Signature conformance
//! checking compares that rendering character-for-character against the
//! rule's source.

use std::error::Error;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::ops::{kernel_table, Kernel};
use crate::signature::{DslType, Param, ReturnType, Signature, NAME_SEPARATOR};

/// Identity of an operator: namespace, name and overload name. The
/// overload name is empty for un-overloaded operators.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpKey {
    pub ns: String,
    pub name: String,
    pub overload: String,
}

impl OpKey {
    pub fn new(
        ns: impl Into<String>,
        name: impl Into<String>,
        overload: impl Into<String>,
    ) -> OpKey {
        OpKey {
            ns: ns.into(),
            name: name.into(),
            overload: overload.into(),
        }
    }

    /// The rule-language function name for this operator
    /// (eg. `aten〇transpose〇int`).
    pub fn rule_name(&self) -> String {
        if self.overload.is_empty() {
            format!("{}{}{}", self.ns, NAME_SEPARATOR, self.name)
        } else {
            format!(
                "{}{}{}{}{}",
                self.ns, NAME_SEPARATOR, self.name, NAME_SEPARATOR, self.overload
            )
        }
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.ns, self.name)?;
        if !self.overload.is_empty() {
            write!(f, ".{}", self.overload)?;
        }
        Ok(())
    }
}

/// Type of an operator parameter or result in the registry's schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaType {
    Tensor,
    Int,
    Float,
    Bool,
    Str,
    Scalar,
    Any,
    List(Box<SchemaType>),
    Optional(Box<SchemaType>),
}

impl SchemaType {
    fn parse(text: &str) -> Option<SchemaType> {
        if let Some(inner) = text.strip_suffix("[]") {
            return Some(SchemaType::List(Box::new(SchemaType::parse(inner)?)));
        }
        if let Some(inner) = text.strip_suffix('?') {
            return Some(SchemaType::Optional(Box::new(SchemaType::parse(inner)?)));
        }
        match text {
            "Tensor" => Some(SchemaType::Tensor),
            "int" => Some(SchemaType::Int),
            "float" => Some(SchemaType::Float),
            "bool" => Some(SchemaType::Bool),
            "str" => Some(SchemaType::Str),
            "Scalar" => Some(SchemaType::Scalar),
            "Any" => Some(SchemaType::Any),
            _ => None,
        }
    }

    /// The rule-language type a parameter of this schema type takes. Rules
    /// see tensors as dimension lists and scalars as floats.
    fn shape_function_type(&self) -> DslType {
        match self {
            SchemaType::Tensor => DslType::List(Box::new(DslType::Int)),
            SchemaType::Int => DslType::Int,
            SchemaType::Float | SchemaType::Scalar => DslType::Float,
            SchemaType::Bool => DslType::Bool,
            SchemaType::Str => DslType::Str,
            SchemaType::Any => DslType::Any,
            SchemaType::List(inner) => DslType::List(Box::new(inner.shape_function_type())),
            SchemaType::Optional(inner) => DslType::Optional(Box::new(inner.shape_function_type())),
        }
    }
}

/// One parameter of an operator schema.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaParam {
    pub name: String,
    pub ty: SchemaType,
    /// Default value literal, exactly as it appears in a conforming rule
    /// signature.
    pub default: Option<String>,
}

/// Canonical description of one operator.
#[derive(Clone, Debug, PartialEq)]
pub struct OpDescriptor {
    key: OpKey,
    params: Vec<SchemaParam>,
    returns: Vec<SchemaType>,
}

impl OpDescriptor {
    pub fn key(&self) -> &OpKey {
        &self.key
    }

    pub fn params(&self) -> &[SchemaParam] {
        &self.params
    }

    /// Render the exact `def` line expected for a rule implementing this
    /// operator.
    pub fn shape_function_signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|param| Param {
                name: param.name.clone(),
                ty: param.ty.shape_function_type(),
                default: param.default.clone(),
            })
            .collect();
        let ret = match self.returns.as_slice() {
            [single] => ReturnType::Single(single.shape_function_type()),
            many => ReturnType::Tuple(many.iter().map(SchemaType::shape_function_type).collect()),
        };
        Signature {
            name: self.key.rule_name(),
            params,
            ret,
        }
        .render()
    }
}

/// Errors from loading or querying the registry.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryError {
    /// The persisted registry description could not be parsed.
    Parse(String),

    /// An entry in the description is malformed.
    InvalidEntry { op: String, message: String },

    /// Two entries share one operator triple.
    DuplicateOp(OpKey),

    /// An operator has no reference implementation bound.
    KernelNotFound { ns: String, name: String },

    /// The requested operator triple is not in the registry.
    OpNotFound(OpKey),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Parse(message) => {
                write!(f, "failed to parse registry description: {}", message)
            }
            RegistryError::InvalidEntry { op, message } => {
                write!(f, "invalid registry entry for {:?}: {}", op, message)
            }
            RegistryError::DuplicateOp(key) => write!(f, "duplicate registry entry for {}", key),
            RegistryError::KernelNotFound { ns, name } => {
                write!(f, "no reference operator bound for {}::{}", ns, name)
            }
            RegistryError::OpNotFound(key) => write!(f, "operator {} not found in registry", key),
        }
    }
}

impl Error for RegistryError {}

#[derive(Deserialize)]
struct RawCatalog {
    ops: Vec<RawOp>,
}

#[derive(Deserialize)]
struct RawOp {
    name: String,
    #[serde(default)]
    overload: String,
    params: Vec<RawParam>,
    returns: Vec<String>,
}

#[derive(Deserialize)]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    default: Option<String>,
}

/// The operator catalog plus the oracle bindings.
pub struct Registry {
    ops: FxHashMap<OpKey, OpDescriptor>,
    kernels: FxHashMap<(String, String), Kernel>,
}

impl Registry {
    /// Reconstruct the registry from its persisted description and bind
    /// the reference operators.
    pub fn load() -> Result<Registry, RegistryError> {
        Registry::from_description(include_str!("registry/ops.json"))
    }

    /// Build a registry from a JSON description.
    pub fn from_description(description: &str) -> Result<Registry, RegistryError> {
        let raw: RawCatalog = serde_json::from_str(description)
            .map_err(|err| RegistryError::Parse(err.to_string()))?;

        let mut ops = FxHashMap::default();
        for op in &raw.ops {
            let (ns, name) = op.name.split_once("::").ok_or_else(|| {
                RegistryError::InvalidEntry {
                    op: op.name.clone(),
                    message: "operator name must be namespace-qualified".to_string(),
                }
            })?;
            let key = OpKey::new(ns, name, op.overload.clone());
            let params = op
                .params
                .iter()
                .map(|param| {
                    let ty = SchemaType::parse(&param.ty).ok_or_else(|| {
                        RegistryError::InvalidEntry {
                            op: op.name.clone(),
                            message: format!("unknown type {:?}", param.ty),
                        }
                    })?;
                    Ok(SchemaParam {
                        name: param.name.clone(),
                        ty,
                        default: param.default.clone(),
                    })
                })
                .collect::<Result<Vec<_>, RegistryError>>()?;
            if op.returns.is_empty() {
                return Err(RegistryError::InvalidEntry {
                    op: op.name.clone(),
                    message: "operator must have at least one return".to_string(),
                });
            }
            let returns = op
                .returns
                .iter()
                .map(|ret| {
                    SchemaType::parse(ret).ok_or_else(|| RegistryError::InvalidEntry {
                        op: op.name.clone(),
                        message: format!("unknown type {:?}", ret),
                    })
                })
                .collect::<Result<Vec<_>, RegistryError>>()?;
            let descriptor = OpDescriptor {
                key: key.clone(),
                params,
                returns,
            };
            if ops.insert(key.clone(), descriptor).is_some() {
                return Err(RegistryError::DuplicateOp(key));
            }
        }

        let kernels: FxHashMap<(String, String), Kernel> = kernel_table()
            .into_iter()
            .map(|((ns, name), kernel)| ((ns.to_string(), name.to_string()), kernel))
            .collect();

        // Every registered operator must have a reference implementation;
        // a miss here would otherwise only surface when a rule attaches
        // invocations to the operator.
        for key in ops.keys() {
            if !kernels.contains_key(&(key.ns.clone(), key.name.clone())) {
                return Err(RegistryError::KernelNotFound {
                    ns: key.ns.clone(),
                    name: key.name.clone(),
                });
            }
        }

        Ok(Registry { ops, kernels })
    }

    /// Look up the descriptor for an operator triple.
    pub fn get_by_triple(&self, key: &OpKey) -> Result<&OpDescriptor, RegistryError> {
        self.ops
            .get(key)
            .ok_or_else(|| RegistryError::OpNotFound(key.clone()))
    }

    /// Look up the reference operator for `(namespace, name)`.
    ///
    /// The overload qualifier is deliberately absent: the bound callable
    /// resolves overloads itself from the kinds of its arguments.
    pub fn kernel(&self, ns: &str, name: &str) -> Result<Kernel, RegistryError> {
        self.kernels
            .get(&(ns.to_string(), name.to_string()))
            .copied()
            .ok_or_else(|| RegistryError::KernelNotFound {
                ns: ns.to_string(),
                name: name.to_string(),
            })
    }

    /// Number of operators in the catalog.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{OpKey, Registry, RegistryError};

    #[test]
    fn test_load_embedded_description() {
        let registry = Registry::load().unwrap();
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_signature_rendering() {
        let registry = Registry::load().unwrap();
        let descriptor = registry
            .get_by_triple(&OpKey::new("aten", "topk", ""))
            .unwrap();
        assert_eq!(
            descriptor.shape_function_signature(),
            "def aten〇topk(self: List[int], k: int, dim: int = -1, largest: bool = True, sorted: bool = True) -> Tuple[List[int], List[int]]:"
        );

        let descriptor = registry
            .get_by_triple(&OpKey::new("aten", "transpose", "int"))
            .unwrap();
        assert_eq!(
            descriptor.shape_function_signature(),
            "def aten〇transpose〇int(self: List[int], dim0: int, dim1: int) -> List[int]:"
        );
    }

    #[test]
    fn test_missing_triple_fails() {
        let registry = Registry::load().unwrap();
        let missing = OpKey::new("aten", "made_up_op", "");
        assert_eq!(
            registry.get_by_triple(&missing),
            Err(RegistryError::OpNotFound(missing.clone()))
        );
    }

    #[test]
    fn test_kernel_lookup_ignores_overload() {
        let registry = Registry::load().unwrap();
        assert!(registry.kernel("aten", "add").is_ok());
        assert!(registry.kernel("prim", "NumToTensor").is_ok());
        assert!(registry.kernel("aten", "made_up_op").is_err());
    }

    #[test]
    fn test_malformed_descriptions_fail() {
        assert!(matches!(
            Registry::from_description("not json"),
            Err(RegistryError::Parse(_))
        ));

        let unqualified = r#"{"ops": [{"name": "topk", "params": [], "returns": ["Tensor"]}]}"#;
        assert!(matches!(
            Registry::from_description(unqualified),
            Err(RegistryError::InvalidEntry { .. })
        ));

        let unknown_type =
            r#"{"ops": [{"name": "aten::topk", "params": [{"name": "x", "type": "Blob"}], "returns": ["Tensor"]}]}"#;
        assert!(matches!(
            Registry::from_description(unknown_type),
            Err(RegistryError::InvalidEntry { .. })
        ));
    }
}
