//! Side-by-side verification of rules against their reference operators.
//!
//! For every invocation attached to a rule, the rule body runs on the
//! shape-domain projection of the arguments while the reference operator
//! runs on the value-domain projection. Each side either produces result
//! shapes or fails; the verifier then classifies the pair:
//!
//! - An error invocation requires *both* sides to fail. One side accepting
//!   an input the other rejects means the rule disagrees with the operator
//!   about the operator's domain.
//! - A normal invocation requires both sides to succeed and to produce the
//!   same number of results with pairwise-equal dimensions.
//!
//! Verification is fail-fast: the first mismatch aborts the pass with a
//! diagnostic naming the rule and the offending invocation.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::args::{normalize_result, Arg, ShapeArg, ValueArg};
use crate::registry::{Registry, RegistryError};
use crate::rules::{EncodeError, Rule, RuleCatalog};
use crate::ops::Kernel;

/// Errors from a verification pass.
#[derive(Debug)]
pub enum VerifyError {
    /// A rule disagreed with its reference operator.
    Mismatch {
        rule: String,
        invocation: String,
        message: String,
    },

    /// An invocation's arguments could not be bound against the rule's
    /// parameter list.
    Encode(EncodeError),

    /// The rule's operator could not be resolved.
    Registry(RegistryError),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::Mismatch {
                rule,
                invocation,
                message,
            } => write!(
                f,
                "For shape function {:?} with invocation {}: {}",
                rule, invocation, message
            ),
            VerifyError::Encode(err) => write!(f, "{}", err),
            VerifyError::Registry(err) => write!(f, "{}", err),
        }
    }
}

impl Error for VerifyError {}

impl From<EncodeError> for VerifyError {
    fn from(err: EncodeError) -> VerifyError {
        VerifyError::Encode(err)
    }
}

impl From<RegistryError> for VerifyError {
    fn from(err: RegistryError) -> VerifyError {
        VerifyError::Registry(err)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

/// Run one side of a verification, capturing both returned errors and
/// panics as the side's failure message.
fn capture<T>(body: impl FnOnce() -> Result<T, String>) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(panic_message(payload)),
    }
}

/// Verify one rule against its reference operator. Returns the number of
/// invocations checked.
pub fn verify_rule(rule: &Rule, kernel: Kernel) -> Result<usize, VerifyError> {
    let mut checked = 0;
    for invocation in rule.invocations() {
        let bound = rule.bind(invocation)?;
        checked += 1;

        let rule_result: Result<Vec<Vec<i64>>, String> = capture(|| {
            let mut shape_args: Vec<ShapeArg> = bound.iter().map(Arg::to_shape_arg).collect();
            rule.run(&mut shape_args)
                .and_then(normalize_result)
                .map_err(|err| err.to_string())
        });
        let op_result: Result<Vec<Vec<usize>>, String> = capture(|| {
            let value_args: Vec<ValueArg> = bound.iter().map(Arg::to_value_arg).collect();
            kernel(&value_args)
                .map(|values| values.iter().map(|value| value.shape().to_vec()).collect())
                .map_err(|err| err.to_string())
        });

        let report = |message: String| VerifyError::Mismatch {
            rule: rule.name().to_string(),
            invocation: invocation.to_string(),
            message,
        };

        if invocation.expect_failure {
            match (&rule_result, &op_result) {
                (Ok(_), Ok(_)) => {
                    return Err(report(
                        "Expected to raise an exception, but neither the shape function nor \
                         the operator raised one."
                            .to_string(),
                    ))
                }
                (Ok(_), Err(op_err)) => {
                    return Err(report(format!(
                        "Operator raised error {:?}, but the shape function did not.",
                        op_err
                    )))
                }
                (Err(fn_err), Ok(_)) => {
                    return Err(report(format!(
                        "Shape function raised error {:?}, but the operator did not.",
                        fn_err
                    )))
                }
                // Both sides agree the input must be rejected.
                (Err(_), Err(_)) => continue,
            }
        }

        match (&rule_result, &op_result) {
            (Err(fn_err), Err(op_err)) => {
                return Err(report(format!(
                    "Both the shape function and the operator raised errors, but were not \
                     expected to. The shape function raised {:?} and the operator raised {:?}.",
                    fn_err, op_err
                )))
            }
            (Err(fn_err), Ok(_)) => {
                return Err(report(format!(
                    "Shape function raised error {:?} but the operator did not raise any error.",
                    fn_err
                )))
            }
            (Ok(_), Err(op_err)) => {
                return Err(report(format!(
                    "Operator raised error {:?} but the shape function did not raise any error.",
                    op_err
                )))
            }
            (Ok(result_shapes), Ok(golden_shapes)) => {
                if result_shapes.len() != golden_shapes.len() {
                    return Err(report(format!(
                        "Expected {} result shapes, got {}",
                        golden_shapes.len(),
                        result_shapes.len()
                    )));
                }
                for (result, golden) in result_shapes.iter().zip(golden_shapes) {
                    // Dimensions are compared pairwise as far as both
                    // shapes reach.
                    for (&dim, &golden_dim) in result.iter().zip(golden) {
                        if dim != golden_dim as i64 {
                            return Err(report(format!(
                                "Expected result shape {:?}, got {:?}",
                                golden, result
                            )));
                        }
                    }
                }
            }
        }
    }
    Ok(checked)
}

/// Verify every rule in the catalog that has invocations and is subject
/// to the registry. Returns the total number of invocations checked.
pub fn verify_catalog(catalog: &RuleCatalog, registry: &Registry) -> Result<usize, VerifyError> {
    let mut checked = 0;
    for rule in catalog.rules() {
        if rule.is_exempt() || rule.invocations().is_empty() {
            continue;
        }
        let kernel = registry.kernel(&rule.key().ns, &rule.key().name)?;
        checked += verify_rule(rule, kernel)?;
    }
    Ok(checked)
}
