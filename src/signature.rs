//! Parsing and rendering of shape function signatures.
//!
//! Shape functions are declared with a `def` line in the rule definition
//! language, eg.
//!
//! ```text
//! def aten〇topk(self: List[int], k: int, dim: int = -1) -> Tuple[List[int], List[int]]:
//! ```
//!
//! The same textual form is produced by the operator registry when it renders
//! the canonical signature expected for a rule, so signature conformance
//! checking is a character-for-character string comparison. This module owns
//! both directions: parsing a `def` line into a structured [`Signature`] and
//! rendering a structured signature back into its canonical text.

use std::error::Error;
use std::fmt;
use std::fmt::Write;

/// Character separating the namespace, operator name and overload name in a
/// shape function name.
///
/// `.` is the natural separator but is not valid in a function name in the
/// rule definition language, so rule names use this stand-in. The compiled
/// library restores `.` as a post-processing step.
pub const NAME_SEPARATOR: char = '〇';

/// Type of a shape function parameter or result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DslType {
    Int,
    Float,
    Bool,
    Str,
    /// Escape hatch for parameters a shape function never inspects (eg.
    /// random generators).
    Any,
    List(Box<DslType>),
    Optional(Box<DslType>),
}

impl DslType {
    /// Parse a type from its textual form (eg. `Optional[List[int]]`).
    pub fn parse(text: &str) -> Result<DslType, SignatureParseError> {
        let text = text.trim();
        if let Some(inner) = text.strip_prefix("List[").and_then(|t| t.strip_suffix(']')) {
            return Ok(DslType::List(Box::new(DslType::parse(inner)?)));
        }
        if let Some(inner) = text
            .strip_prefix("Optional[")
            .and_then(|t| t.strip_suffix(']'))
        {
            return Ok(DslType::Optional(Box::new(DslType::parse(inner)?)));
        }
        match text {
            "int" => Ok(DslType::Int),
            "float" => Ok(DslType::Float),
            "bool" => Ok(DslType::Bool),
            "str" => Ok(DslType::Str),
            "Any" => Ok(DslType::Any),
            _ => Err(SignatureParseError::UnknownType(text.to_string())),
        }
    }
}

impl fmt::Display for DslType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DslType::Int => write!(f, "int"),
            DslType::Float => write!(f, "float"),
            DslType::Bool => write!(f, "bool"),
            DslType::Str => write!(f, "str"),
            DslType::Any => write!(f, "Any"),
            DslType::List(inner) => write!(f, "List[{}]", inner),
            DslType::Optional(inner) => write!(f, "Optional[{}]", inner),
        }
    }
}

/// A single parameter in a shape function signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: DslType,
    /// Default value literal, exactly as written (eg. `-1`, `True`, `(1, 1)`).
    pub default: Option<String>,
}

/// Result type of a shape function.
#[derive(Clone, Debug, PartialEq)]
pub enum ReturnType {
    Single(DslType),
    Tuple(Vec<DslType>),
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Single(ty) => write!(f, "{}", ty),
            ReturnType::Tuple(types) => {
                write!(f, "Tuple[")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", ty)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Parsed form of a shape function's `def` line.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: ReturnType,
}

/// Errors from parsing a shape function signature.
#[derive(Clone, Debug, PartialEq)]
pub enum SignatureParseError {
    /// The line does not start with the function-definition keyword.
    MissingDef,
    /// The line is structurally malformed.
    Malformed(&'static str),
    /// A parameter or return type was not recognized.
    UnknownType(String),
}

impl fmt::Display for SignatureParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureParseError::MissingDef => {
                write!(f, "signature does not start with \"def \"")
            }
            SignatureParseError::Malformed(what) => write!(f, "malformed signature: {}", what),
            SignatureParseError::UnknownType(ty) => write!(f, "unknown type {:?}", ty),
        }
    }
}

impl Error for SignatureParseError {}

/// Split `text` on commas that are not nested inside brackets or parens.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (pos, ch) in text.char_indices() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn parse_param(text: &str) -> Result<Param, SignatureParseError> {
    let (name, rest) = text
        .split_once(':')
        .ok_or(SignatureParseError::Malformed("parameter without a type"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(SignatureParseError::Malformed("empty parameter name"));
    }
    let (ty_text, default) = match rest.split_once('=') {
        Some((ty_text, default)) => (ty_text, Some(default.trim().to_string())),
        None => (rest, None),
    };
    Ok(Param {
        name: name.to_string(),
        ty: DslType::parse(ty_text)?,
        default,
    })
}

fn parse_return(text: &str) -> Result<ReturnType, SignatureParseError> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix("Tuple[").and_then(|t| t.strip_suffix(']')) {
        let types = split_top_level(inner)
            .into_iter()
            .map(DslType::parse)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(ReturnType::Tuple(types));
    }
    Ok(ReturnType::Single(DslType::parse(text)?))
}

impl Signature {
    /// Parse a `def` line into a structured signature.
    pub fn parse(line: &str) -> Result<Signature, SignatureParseError> {
        let line = line.trim_end();
        let rest = line.strip_prefix("def ").ok_or(SignatureParseError::MissingDef)?;
        let (name, rest) = rest
            .split_once('(')
            .ok_or(SignatureParseError::Malformed("missing parameter list"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SignatureParseError::Malformed("empty function name"));
        }

        // Find the parameter list's closing paren, skipping nested brackets
        // in types and tuple-shaped default values.
        let mut depth = 0usize;
        let mut params_end = None;
        for (pos, ch) in rest.char_indices() {
            match ch {
                '[' | '(' => depth += 1,
                ')' if depth == 0 => {
                    params_end = Some(pos);
                    break;
                }
                ']' | ')' => depth -= 1,
                _ => {}
            }
        }
        let params_end =
            params_end.ok_or(SignatureParseError::Malformed("unterminated parameter list"))?;
        let params_text = &rest[..params_end];
        let tail = &rest[params_end + 1..];

        let ret_text = tail
            .strip_prefix(" -> ")
            .and_then(|t| t.strip_suffix(':'))
            .ok_or(SignatureParseError::Malformed("missing return annotation"))?;

        let params = if params_text.trim().is_empty() {
            Vec::new()
        } else {
            split_top_level(params_text)
                .into_iter()
                .map(parse_param)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Signature {
            name: name.to_string(),
            params,
            ret: parse_return(ret_text)?,
        })
    }

    /// Render the canonical textual form of this signature.
    ///
    /// Parsing a canonical `def` line and rendering it reproduces the line
    /// exactly.
    pub fn render(&self) -> String {
        let mut out = String::new();
        write!(out, "def {}(", self.name).unwrap();
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write!(out, "{}: {}", param.name, param.ty).unwrap();
            if let Some(default) = &param.default {
                write!(out, " = {}", default).unwrap();
            }
        }
        write!(out, ") -> {}:", self.ret).unwrap();
        out
    }

    /// Split the function name into its `(namespace, operator, overload)`
    /// atoms, or `None` if the name is not operator-keyed (two or three
    /// parts joined with [`NAME_SEPARATOR`]).
    pub fn key_atoms(&self) -> Option<(String, String, String)> {
        let atoms: Vec<&str> = self.name.split(NAME_SEPARATOR).collect();
        match atoms.as_slice() {
            [ns, op] => Some((ns.to_string(), op.to_string(), String::new())),
            [ns, op, overload] => Some((ns.to_string(), op.to_string(), overload.to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use shapegen_testing::TestCases;

    use super::{DslType, Param, ReturnType, Signature, SignatureParseError};

    #[test]
    fn test_parse_render_round_trip() {
        #[derive(Debug)]
        struct Case {
            line: &'static str,
        }

        let cases = [
            Case {
                line: "def aten〇tanh(self: List[int]) -> List[int]:",
            },
            Case {
                line: "def aten〇topk(self: List[int], k: int, dim: int = -1, largest: bool = True, sorted: bool = True) -> Tuple[List[int], List[int]]:",
            },
            Case {
                line: "def aten〇conv2d(input: List[int], weight: List[int], bias: Optional[List[int]] = None, stride: List[int] = (1, 1), padding: List[int] = (0, 0), dilation: List[int] = (1, 1), groups: int = 1) -> List[int]:",
            },
            Case {
                line: "def aten〇index〇Tensor(self: List[int], indices: List[Optional[List[int]]]) -> List[int]:",
            },
            Case {
                line: "def aten〇uniform(self: List[int], from_: float = 0., to: float = 1., generator: Any = None) -> List[int]:",
            },
            Case {
                line: "def prim〇NumToTensor〇Scalar(a: float) -> List[int]:",
            },
        ];

        cases.test_each(|case| {
            let sig = Signature::parse(case.line).unwrap();
            assert_eq!(sig.render(), case.line);
        });
    }

    #[test]
    fn test_parse_structure() {
        let sig = Signature::parse(
            "def aten〇gelu(self: List[int], approximate: str = \"none\") -> List[int]:",
        )
        .unwrap();
        assert_eq!(sig.name, "aten〇gelu");
        assert_eq!(
            sig.params,
            vec![
                Param {
                    name: "self".to_string(),
                    ty: DslType::List(Box::new(DslType::Int)),
                    default: None,
                },
                Param {
                    name: "approximate".to_string(),
                    ty: DslType::Str,
                    default: Some("\"none\"".to_string()),
                },
            ]
        );
        assert_eq!(sig.ret, ReturnType::Single(DslType::List(Box::new(DslType::Int))));
    }

    #[test]
    fn test_parse_errors() {
        #[derive(Debug)]
        struct Case {
            line: &'static str,
            expected: SignatureParseError,
        }

        let cases = [
            Case {
                line: "fn aten〇tanh(self: List[int]) -> List[int]:",
                expected: SignatureParseError::MissingDef,
            },
            Case {
                line: "def aten〇tanh(self: List[int]) -> List[int]",
                expected: SignatureParseError::Malformed("missing return annotation"),
            },
            Case {
                line: "def aten〇tanh(self) -> List[int]:",
                expected: SignatureParseError::Malformed("parameter without a type"),
            },
            Case {
                line: "def aten〇tanh(self: Shape) -> List[int]:",
                expected: SignatureParseError::UnknownType("Shape".to_string()),
            },
        ];

        cases.test_each(|case| {
            let err = Signature::parse(case.line).err().unwrap();
            assert_eq!(err, case.expected);
        });
    }

    #[test]
    fn test_key_atoms() {
        let sig = Signature::parse("def aten〇transpose〇int(self: List[int], dim0: int, dim1: int) -> List[int]:").unwrap();
        assert_eq!(
            sig.key_atoms(),
            Some(("aten".to_string(), "transpose".to_string(), "int".to_string()))
        );

        let sig = Signature::parse("def aten〇t(self: List[int]) -> List[int]:").unwrap();
        assert_eq!(
            sig.key_atoms(),
            Some(("aten".to_string(), "t".to_string(), String::new()))
        );

        let sig = Signature::parse("def helper(self: List[int]) -> List[int]:").unwrap();
        assert_eq!(sig.key_atoms(), None);
    }
}
