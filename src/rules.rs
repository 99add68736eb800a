//! Shape rule definitions and the rule catalog.
//!
//! A [`Rule`] pairs an operator triple with a pure body computing output
//! shapes from input shapes, the rule's declared `def` line, and the
//! invocations used to verify it against the real operator. Rules are
//! registered explicitly on a [`RuleCatalog`], in a fixed order that the
//! compiler preserves, rather than discovered by scanning a live namespace.

use std::error::Error;
use std::fmt;

use crate::args::{Arg, Invocation, ShapeArg};
use crate::registry::OpKey;
use crate::shape_fns::ShapeError;
use crate::signature::{Signature, SignatureParseError};

/// A rule body: a pure function from bound shape-domain arguments to a
/// shape result.
///
/// The argument slice is freshly allocated per invocation, so bodies may
/// mutate shape lists in place.
pub type RuleFn = fn(&mut [ShapeArg]) -> Result<ShapeArg, ShapeError>;

/// Errors from building the rule catalog.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleError {
    /// The rule source has no `def` line.
    MissingDefLine(String),

    /// The rule's `def` line could not be parsed.
    Signature {
        source: String,
        error: SignatureParseError,
    },

    /// The rule name does not encode an operator triple.
    NotOperatorKeyed(String),

    /// A parameter default could not be interpreted.
    BadDefault {
        rule: String,
        param: String,
        text: String,
    },

    /// Two rules share one name.
    Duplicate(String),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::MissingDefLine(source) => {
                write!(f, "no \"def\" line in rule source {:?}", source)
            }
            RuleError::Signature { source, error } => {
                write!(f, "could not parse signature of {:?}: {}", source, error)
            }
            RuleError::NotOperatorKeyed(name) => {
                write!(f, "rule name {:?} does not encode an operator", name)
            }
            RuleError::BadDefault { rule, param, text } => {
                write!(f, "rule {:?} has unparseable default {:?} for {:?}", rule, text, param)
            }
            RuleError::Duplicate(name) => write!(f, "duplicate rule {:?}", name),
        }
    }
}

impl Error for RuleError {}

/// Errors from binding an invocation's arguments against a rule's
/// parameter list. These are authoring errors in a rule's test data and
/// abort the whole run.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeError {
    TooManyArgs {
        rule: String,
        given: usize,
        expected: usize,
    },
    UnknownKwarg {
        rule: String,
        name: String,
    },
    DuplicateArg {
        rule: String,
        name: String,
    },
    MissingArg {
        rule: String,
        name: String,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::TooManyArgs {
                rule,
                given,
                expected,
            } => write!(
                f,
                "rule {:?} takes {} arguments but the invocation has {}",
                rule, expected, given
            ),
            EncodeError::UnknownKwarg { rule, name } => {
                write!(f, "rule {:?} has no parameter named {:?}", rule, name)
            }
            EncodeError::DuplicateArg { rule, name } => {
                write!(f, "parameter {:?} of rule {:?} bound twice", name, rule)
            }
            EncodeError::MissingArg { rule, name } => {
                write!(f, "missing argument {:?} for rule {:?}", name, rule)
            }
        }
    }
}

impl Error for EncodeError {}

/// Interpret a default-value literal from a signature.
fn parse_default(text: &str) -> Option<Arg> {
    match text {
        "None" => Some(Arg::None),
        "True" => Some(Arg::Bool(true)),
        "False" => Some(Arg::Bool(false)),
        _ => {
            if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
                let inner = inner.trim().trim_end_matches(',');
                let mut items = Vec::new();
                if !inner.trim().is_empty() {
                    for part in inner.split(',') {
                        items.push(Arg::Int(part.trim().parse().ok()?));
                    }
                }
                return Some(Arg::Tuple(items));
            }
            if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
                return Some(Arg::Str(inner.to_string()));
            }
            if let Ok(value) = text.parse::<i64>() {
                return Some(Arg::Int(value));
            }
            if let Ok(value) = text.parse::<f64>() {
                return Some(Arg::Float(value));
            }
            None
        }
    }
}

/// One shape rule.
pub struct Rule {
    key: OpKey,
    source: &'static str,
    signature: Signature,
    defaults: Vec<Option<Arg>>,
    body: RuleFn,
    invocations: Vec<Invocation>,
    exempt: bool,
}

impl Rule {
    fn new(source: &'static str, body: RuleFn) -> Result<Rule, RuleError> {
        let def_line = source
            .lines()
            .find(|line| line.starts_with("def "))
            .ok_or_else(|| RuleError::MissingDefLine(source.to_string()))?;
        let signature = Signature::parse(def_line).map_err(|error| RuleError::Signature {
            source: def_line.to_string(),
            error,
        })?;
        let (ns, name, overload) = signature
            .key_atoms()
            .ok_or_else(|| RuleError::NotOperatorKeyed(signature.name.clone()))?;
        let defaults = signature
            .params
            .iter()
            .map(|param| match &param.default {
                None => Ok(None),
                Some(text) => match parse_default(text) {
                    Some(arg) => Ok(Some(arg)),
                    None => Err(RuleError::BadDefault {
                        rule: signature.name.clone(),
                        param: param.name.clone(),
                        text: text.clone(),
                    }),
                },
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Rule {
            key: OpKey::new(ns, name, overload),
            source,
            signature,
            defaults,
            body,
            invocations: Vec::new(),
            exempt: false,
        })
    }

    /// Attach the invocations used to verify this rule.
    pub fn with_invocations(&mut self, invocations: Vec<Invocation>) -> &mut Rule {
        self.invocations = invocations;
        self
    }

    /// Mark this rule as implementing an operator that is not present in
    /// the canonical registry. Such rules are skipped by signature
    /// conformance checking and verification.
    pub fn not_in_registry(&mut self) -> &mut Rule {
        self.exempt = true;
        self
    }

    pub fn key(&self) -> &OpKey {
        &self.key
    }

    /// The rule's function name (eg. `aten〇topk`).
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// The first source line starting with the function-definition keyword.
    pub fn def_line(&self) -> &'static str {
        // Existence was checked when the rule was built.
        self.source
            .lines()
            .find(|line| line.starts_with("def "))
            .unwrap_or(self.source)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    pub fn is_exempt(&self) -> bool {
        self.exempt
    }

    /// Execute the rule body on bound shape-domain arguments.
    pub fn run(&self, args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
        (self.body)(args)
    }

    /// Bind an invocation against this rule's parameter list: positional
    /// arguments in order, keyword arguments by name, defaults for the
    /// rest. The result is aligned with the parameters.
    pub fn bind(&self, invocation: &Invocation) -> Result<Vec<Arg>, EncodeError> {
        let params = &self.signature.params;
        if invocation.args.len() > params.len() {
            return Err(EncodeError::TooManyArgs {
                rule: self.name().to_string(),
                given: invocation.args.len(),
                expected: params.len(),
            });
        }
        let mut slots: Vec<Option<Arg>> = vec![None; params.len()];
        for (slot, arg) in slots.iter_mut().zip(&invocation.args) {
            *slot = Some(arg.clone());
        }
        for (name, value) in &invocation.kwargs {
            let index = params.iter().position(|param| param.name == *name).ok_or_else(|| {
                EncodeError::UnknownKwarg {
                    rule: self.name().to_string(),
                    name: name.to_string(),
                }
            })?;
            if slots[index].is_some() {
                return Err(EncodeError::DuplicateArg {
                    rule: self.name().to_string(),
                    name: name.to_string(),
                });
            }
            slots[index] = Some(value.clone());
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                if let Some(arg) = slot {
                    return Ok(arg);
                }
                if let Some(default) = &self.defaults[index] {
                    return Ok(default.clone());
                }
                Err(EncodeError::MissingArg {
                    rule: self.name().to_string(),
                    name: params[index].name.clone(),
                })
            })
            .collect()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name())
            .field("invocations", &self.invocations.len())
            .field("exempt", &self.exempt)
            .finish()
    }
}

/// An ordered collection of rules.
///
/// Iteration order is registration order, which fixes the order rules are
/// verified, checked and compiled in.
#[derive(Default)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    pub fn new() -> RuleCatalog {
        RuleCatalog { rules: Vec::new() }
    }

    /// Register a rule. `source` must contain a `def` line declaring an
    /// operator-keyed name.
    pub fn add(&mut self, source: &'static str, body: RuleFn) -> Result<&mut Rule, RuleError> {
        let rule = Rule::new(source, body)?;
        if self.rules.iter().any(|existing| existing.name() == rule.name()) {
            return Err(RuleError::Duplicate(rule.name().to_string()));
        }
        self.rules.push(rule);
        Ok(self.rules.last_mut().expect("rule was just pushed"))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name() == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use shapegen_testing::TestCases;

    use super::{parse_default, EncodeError, RuleCatalog, RuleError};
    use crate::args::{Arg, Invocation, ShapeArg, TensorOfShape};
    use crate::shape_fns::ShapeError;

    fn unary(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
        Ok(ShapeArg::Ints(args[0].ints()?))
    }

    #[test]
    fn test_parse_default() {
        #[derive(Debug)]
        struct Case {
            text: &'static str,
            expected: Option<Arg>,
        }

        let cases = [
            Case {
                text: "None",
                expected: Some(Arg::None),
            },
            Case {
                text: "True",
                expected: Some(Arg::Bool(true)),
            },
            Case {
                text: "-1",
                expected: Some(Arg::Int(-1)),
            },
            Case {
                text: "0.",
                expected: Some(Arg::Float(0.)),
            },
            Case {
                text: "1.0000000000000001e-05",
                expected: Some(Arg::Float(1.0000000000000001e-05)),
            },
            Case {
                text: "(1, 1)",
                expected: Some(Arg::Tuple(vec![Arg::Int(1), Arg::Int(1)])),
            },
            Case {
                text: "()",
                expected: Some(Arg::Tuple(vec![])),
            },
            Case {
                text: "\"none\"",
                expected: Some(Arg::Str("none".to_string())),
            },
            Case {
                text: "banana",
                expected: None,
            },
        ];

        cases.test_each(|case| {
            assert_eq!(parse_default(case.text), case.expected);
        });
    }

    #[test]
    fn test_add_rejects_malformed_rules() {
        let mut rules = RuleCatalog::new();
        assert!(matches!(
            rules.add("not a def line", unary),
            Err(RuleError::MissingDefLine(_))
        ));
        assert!(matches!(
            rules.add("def helper(self: List[int]) -> List[int]:", unary),
            Err(RuleError::NotOperatorKeyed(_))
        ));

        rules
            .add("def aten〇tanh(self: List[int]) -> List[int]:", unary)
            .unwrap();
        assert!(matches!(
            rules.add("def aten〇tanh(self: List[int]) -> List[int]:", unary),
            Err(RuleError::Duplicate(_))
        ));
    }

    #[test]
    fn test_def_line_skips_leading_annotations() {
        let mut rules = RuleCatalog::new();
        let rule = rules
            .add(
                "# clamps negatives to zero\ndef aten〇relu(self: List[int]) -> List[int]:\n    return self\n",
                unary,
            )
            .unwrap();
        assert_eq!(rule.def_line(), "def aten〇relu(self: List[int]) -> List[int]:");
    }

    #[test]
    fn test_bind() {
        let mut rules = RuleCatalog::new();
        let rule = rules
            .add(
                "def aten〇topk(self: List[int], k: int, dim: int = -1, largest: bool = True, sorted: bool = True) -> Tuple[List[int], List[int]]:",
                unary,
            )
            .unwrap();

        // Positional + defaults.
        let bound = rule
            .bind(&Invocation::new(vec![
                Arg::Tensor(TensorOfShape::new([2, 3])),
                Arg::Int(1),
            ]))
            .unwrap();
        assert_eq!(bound.len(), 5);
        assert_eq!(bound[2], Arg::Int(-1));
        assert_eq!(bound[3], Arg::Bool(true));

        // Keyword argument overrides a default.
        let bound = rule
            .bind(
                &Invocation::new(vec![
                    Arg::Tensor(TensorOfShape::new([2, 3])),
                    Arg::Int(1),
                ])
                .kwarg("dim", 0),
            )
            .unwrap();
        assert_eq!(bound[2], Arg::Int(0));

        // Unknown keyword.
        let err = rule
            .bind(
                &Invocation::new(vec![Arg::Tensor(TensorOfShape::new([2, 3])), Arg::Int(1)])
                    .kwarg("banana", 0),
            )
            .unwrap_err();
        assert!(matches!(err, EncodeError::UnknownKwarg { .. }));

        // Duplicate binding.
        let err = rule
            .bind(
                &Invocation::new(vec![Arg::Tensor(TensorOfShape::new([2, 3])), Arg::Int(1)])
                    .kwarg("k", 2),
            )
            .unwrap_err();
        assert!(matches!(err, EncodeError::DuplicateArg { .. }));

        // Missing required argument.
        let err = rule
            .bind(&Invocation::new(vec![Arg::Tensor(TensorOfShape::new([2, 3]))]))
            .unwrap_err();
        assert!(matches!(err, EncodeError::MissingArg { .. }));

        // Too many positional arguments.
        let err = rule
            .bind(&Invocation::new(vec![
                Arg::Int(0),
                Arg::Int(0),
                Arg::Int(0),
                Arg::Int(0),
                Arg::Int(0),
                Arg::Int(0),
            ]))
            .unwrap_err();
        assert!(matches!(err, EncodeError::TooManyArgs { .. }));
    }
}
