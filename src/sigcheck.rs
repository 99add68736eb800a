//! Signature conformance checking.
//!
//! A rule's declared `def` line and the registry's canonical signature for
//! the same operator evolve independently. This check pins them together:
//! the rule's line must equal the registry's rendering character for
//! character. A rule with a stale parameter list would otherwise compile
//! into the library and fail, or silently compute wrong shapes, inside the
//! downstream consumer.

use std::error::Error;
use std::fmt;

use crate::registry::{Registry, RegistryError};
use crate::rules::{Rule, RuleCatalog};

/// Errors from signature conformance checking.
#[derive(Clone, Debug, PartialEq)]
pub enum SignatureError {
    /// The declared signature does not match the registry's.
    Mismatch {
        rule: String,
        expected: String,
        actual: String,
    },

    /// The rule's operator could not be resolved.
    Registry(RegistryError),
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::Mismatch {
                rule,
                expected,
                actual,
            } => write!(
                f,
                "Signature mismatch for {:?}: expected {:?}, got {:?}",
                rule, expected, actual
            ),
            SignatureError::Registry(err) => write!(f, "{}", err),
        }
    }
}

impl Error for SignatureError {}

impl From<RegistryError> for SignatureError {
    fn from(err: RegistryError) -> SignatureError {
        SignatureError::Registry(err)
    }
}

/// Check one rule's declared signature against the registry.
pub fn check_rule(rule: &Rule, registry: &Registry) -> Result<(), SignatureError> {
    let descriptor = registry.get_by_triple(rule.key())?;
    let expected = descriptor.shape_function_signature();
    let actual = rule.def_line();
    if actual != expected {
        return Err(SignatureError::Mismatch {
            rule: rule.name().to_string(),
            expected,
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Check every non-exempt rule in the catalog. Returns the number of rules
/// checked.
///
/// The check is pure: running it twice against the same catalog and
/// registry gives the same verdict.
pub fn check_catalog(catalog: &RuleCatalog, registry: &Registry) -> Result<usize, SignatureError> {
    let mut checked = 0;
    for rule in catalog.rules() {
        if rule.is_exempt() {
            continue;
        }
        check_rule(rule, registry)?;
        checked += 1;
    }
    Ok(checked)
}

#[cfg(test)]
mod tests {
    use super::{check_catalog, check_rule, SignatureError};
    use crate::args::ShapeArg;
    use crate::catalog::catalog;
    use crate::registry::Registry;
    use crate::rules::RuleCatalog;
    use crate::shape_fns::ShapeError;

    fn body(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
        Ok(ShapeArg::Ints(args[0].ints()?))
    }

    #[test]
    fn test_full_catalog_conforms() {
        let rules = catalog().unwrap();
        let registry = Registry::load().unwrap();
        let checked = check_catalog(&rules, &registry).unwrap();
        // Exempt rules are skipped.
        assert_eq!(checked, rules.len() - 2);
    }

    #[test]
    fn test_check_is_idempotent() {
        let rules = catalog().unwrap();
        let registry = Registry::load().unwrap();
        let first = check_catalog(&rules, &registry).unwrap();
        let second = check_catalog(&rules, &registry).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_drifted_signature_shows_both_lines() {
        let registry = Registry::load().unwrap();
        let mut rules = RuleCatalog::new();
        // Stale signature: the registry's argmax also takes `keepdim`.
        rules
            .add(
                "def aten〇argmax(self: List[int], dim: Optional[int] = None) -> List[int]:",
                body,
            )
            .unwrap();

        let err = check_rule(rules.get("aten〇argmax").unwrap(), &registry).unwrap_err();
        let SignatureError::Mismatch {
            expected, actual, ..
        } = &err
        else {
            panic!("expected a mismatch, got {:?}", err);
        };
        assert!(expected.contains("keepdim: bool = False"));
        assert!(!actual.contains("keepdim"));

        // Both signatures appear in the diagnostic for diffing by eye.
        let message = err.to_string();
        assert!(message.contains(expected.as_str()));
        assert!(message.contains(actual.as_str()));
    }

    #[test]
    fn test_unknown_operator_is_a_registry_error() {
        let registry = Registry::load().unwrap();
        let mut rules = RuleCatalog::new();
        rules
            .add("def aten〇made_up_op(self: List[int]) -> List[int]:", body)
            .unwrap();
        let err = check_rule(rules.get("aten〇made_up_op").unwrap(), &registry).unwrap_err();
        assert!(matches!(err, SignatureError::Registry(_)));
    }
}
