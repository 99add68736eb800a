//! Shape function rule engine, cross-checker and library compiler.
//!
//! # About shape rules
//!
//! A compiler that refines tensor types needs to know, for every operator,
//! how output shapes follow from input shapes. That knowledge lives here
//! as a catalog of *shape rules*: pure functions from input dimension
//! lists to output dimension lists, one per operator overload. The catalog
//! is compiled into a single serialized library that a downstream shape
//! refinement pass embeds and evaluates to a fixed point.
//!
//! Shape rules are easy to get subtly wrong, so the engine treats them as
//! claims to be proven rather than code to be trusted:
//!
//! - Each rule can attach [`Invocation`]s: argument lists built from
//!   symbolic [`TensorOfShape`] placeholders. The [`verify`] pass runs the
//!   rule on the shape projection of each invocation and the real operator
//!   (a reference implementation from the [`registry`]) on the value
//!   projection, and requires the two sides to agree, both about result
//!   shapes and about which inputs must be rejected.
//! - Each rule's declared `def` line is compared character for character
//!   against the signature the registry renders for that operator
//!   ([`sigcheck`]), so a rule cannot drift silently when an operator's
//!   schema changes.
//! - Only a catalog that passes both gates is compiled ([`compile`]) into
//!   the `ShapeLibrary.rs` artifact, with deterministically renamed
//!   exported symbols.
//!
//! # Example
//!
//! ```no_run
//! use shapegen::{catalog, compile, IrModuleBuilder, Registry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rules = catalog::catalog()?;
//! let registry = Registry::load()?;
//! let mut builder = IrModuleBuilder::new();
//! let path = compile::generate_shape_library(
//!     &rules,
//!     &registry,
//!     &mut builder,
//!     std::path::Path::new("out"),
//! )?;
//! println!("wrote {}", path.display());
//! # Ok(()) }
//! ```

pub mod args;
pub mod catalog;
pub mod compile;
pub mod ops;
pub mod registry;
pub mod rules;
pub mod shape_fns;
pub mod sigcheck;
pub mod signature;
pub mod verify;

pub use args::{long_tensor, Arg, DType, Invocation, TensorOfShape, Value};
pub use compile::{generate_shape_library, GenerateError, IrModuleBuilder, ModuleBuilder};
pub use registry::{OpKey, Registry, RegistryError};
pub use rules::{Rule, RuleCatalog, RuleError};
pub use sigcheck::check_catalog;
pub use verify::verify_catalog;
