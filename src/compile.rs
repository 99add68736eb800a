//! Compilation of the verified rule catalog into the shape library
//! artifact.
//!
//! The pipeline is: verify every rule, check every signature, import every
//! rule into one IR module, canonicalize, serialize, rewrite symbols and
//! write the artifact. Any failure aborts before the output file is
//! touched; a partially valid library cannot be loaded safely by the
//! consuming shape refinement pass, so the artifact is all-or-nothing.
//!
//! Importing a rule body into the IR module is the job of an external
//! scripting compiler, reached through the [`ModuleBuilder`] trait. The
//! in-tree [`IrModuleBuilder`] lowers each rule's interface to an IR
//! function whose body is a single opaque `rules.infer` operation; it
//! exists to drive the pipeline and its tests, not to compile rule bodies.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::registry::Registry;
use crate::rules::{Rule, RuleCatalog};
use crate::sigcheck::{self, SignatureError};
use crate::signature::{DslType, ReturnType};
use crate::verify::{self, VerifyError};

/// Name of the emitted artifact inside the output directory.
pub const SHAPE_LIBRARY_FILE: &str = "ShapeLibrary.rs";

/// Errors from building the IR module.
#[derive(Clone, Debug, PartialEq)]
pub enum CompileError {
    /// Two rules lowered to the same exported symbol.
    DuplicateSymbol(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::DuplicateSymbol(symbol) => {
                write!(f, "duplicate exported symbol {:?}", symbol)
            }
        }
    }
}

impl Error for CompileError {}

/// The scripting-compiler boundary: accumulates compiled rules into one
/// module, canonicalizes it and serializes it to IR text.
pub trait ModuleBuilder {
    /// Compile one rule into the module.
    fn import_rule(&mut self, rule: &Rule) -> Result<(), CompileError>;

    /// Run the canonicalization pass over the whole module, producing a
    /// simplified but equivalent module.
    fn canonicalize(&mut self) -> Result<(), CompileError>;

    /// Serialize the module to IR text.
    fn get_asm(&self) -> String;
}

struct IrFunc {
    symbol: String,
    params: Vec<String>,
    results: Vec<String>,
}

/// Reference [`ModuleBuilder`] lowering rule interfaces only.
///
/// Exported symbols live under the `__rules__` compilation-unit namespace
/// and carry the rule's name verbatim, so the separator character shows up
/// in serialized symbol names in its escaped byte form.
#[derive(Default)]
pub struct IrModuleBuilder {
    funcs: Vec<IrFunc>,
}

fn ir_type_bare(ty: &DslType) -> String {
    match ty {
        DslType::Int => "int".to_string(),
        DslType::Float => "float".to_string(),
        DslType::Bool => "bool".to_string(),
        DslType::Str => "str".to_string(),
        DslType::Any => "any".to_string(),
        DslType::List(inner) => format!("list<{}>", ir_type_bare(inner)),
        DslType::Optional(inner) => format!("optional<{}>", ir_type_bare(inner)),
    }
}

fn ir_type(ty: &DslType) -> String {
    format!("!rules.{}", ir_type_bare(ty))
}

/// Escape a symbol name for serialization: printable ASCII passes
/// through, everything else becomes an escaped byte.
fn escape_symbol(symbol: &str) -> String {
    let mut out = String::with_capacity(symbol.len());
    for &byte in symbol.as_bytes() {
        let ch = byte as char;
        if (' '..='~').contains(&ch) && ch != '"' && ch != '\\' {
            out.push(ch);
        } else {
            out.push_str(&format!("\\{:02X}", byte));
        }
    }
    out
}

impl IrModuleBuilder {
    pub fn new() -> IrModuleBuilder {
        IrModuleBuilder::default()
    }
}

impl ModuleBuilder for IrModuleBuilder {
    fn import_rule(&mut self, rule: &Rule) -> Result<(), CompileError> {
        let symbol = format!("__rules__.{}", rule.name());
        if self.funcs.iter().any(|func| func.symbol == symbol) {
            return Err(CompileError::DuplicateSymbol(symbol));
        }
        let signature = rule.signature();
        let params = signature.params.iter().map(|param| ir_type(&param.ty)).collect();
        let results = match &signature.ret {
            ReturnType::Single(ty) => vec![ir_type(ty)],
            ReturnType::Tuple(types) => types.iter().map(ir_type).collect(),
        };
        self.funcs.push(IrFunc {
            symbol,
            params,
            results,
        });
        Ok(())
    }

    fn canonicalize(&mut self) -> Result<(), CompileError> {
        // Interface-only functions are already in canonical form; this
        // revalidates the module's invariants. Structural simplification of
        // rule bodies happens in the external pass pipeline.
        for (i, func) in self.funcs.iter().enumerate() {
            if self.funcs[..i].iter().any(|other| other.symbol == func.symbol) {
                return Err(CompileError::DuplicateSymbol(func.symbol.clone()));
            }
        }
        Ok(())
    }

    fn get_asm(&self) -> String {
        let mut out = String::from("module {\n");
        for func in &self.funcs {
            let args: Vec<String> = func
                .params
                .iter()
                .enumerate()
                .map(|(i, ty)| format!("%arg{}: {}", i, ty))
                .collect();
            let operands: Vec<String> = (0..func.params.len()).map(|i| format!("%arg{}", i)).collect();
            let param_types = func.params.join(", ");
            let result_types = func.results.join(", ");
            let result_group = if func.results.len() == 1 {
                result_types.clone()
            } else {
                format!("({})", result_types)
            };
            out.push_str(&format!(
                "  func.func @\"{}\"({}) -> {} {{\n",
                escape_symbol(&func.symbol),
                args.join(", "),
                result_group,
            ));
            if func.results.len() == 1 {
                out.push_str(&format!(
                    "    %0 = \"rules.infer\"({}) : ({}) -> {}\n",
                    operands.join(", "),
                    param_types,
                    result_group,
                ));
                out.push_str(&format!("    return %0 : {}\n", result_types));
            } else {
                out.push_str(&format!(
                    "    %0:{} = \"rules.infer\"({}) : ({}) -> {}\n",
                    func.results.len(),
                    operands.join(", "),
                    param_types,
                    result_group,
                ));
                let returned: Vec<String> =
                    (0..func.results.len()).map(|i| format!("%0#{}", i)).collect();
                out.push_str(&format!(
                    "    return {} : {}\n",
                    returned.join(", "),
                    result_types
                ));
            }
            out.push_str("  }\n");
        }
        out.push_str("}\n");
        out
    }
}

/// Apply the two fixed symbol rewrites to the serialized module.
///
/// Both are a compatibility contract with the consuming shape refinement
/// pass and must be preserved exactly:
///
/// - the name-separator character, serialized as its escaped UTF-8 bytes
///   `\E3\80\87`, becomes a plain `.`;
/// - the compilation-unit prefixes `__rules__.aten` and `__rules__.prim`
///   become `__shape_fn__.aten` and `__shape_fn__.prim`, so the exported
///   names cannot collide with identically-named user symbols downstream.
pub fn apply_symbol_rewrites(asm: &str) -> String {
    asm.replace("\\E3\\80\\87", ".")
        .replace("__rules__.aten", "__shape_fn__.aten")
        .replace("__rules__.prim", "__shape_fn__.prim")
}

/// Errors from the library generation pipeline.
#[derive(Debug)]
pub enum GenerateError {
    Verify(VerifyError),
    Signature(SignatureError),
    Compile(CompileError),
    Io(io::Error),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Verify(err) => write!(f, "{}", err),
            GenerateError::Signature(err) => write!(f, "{}", err),
            GenerateError::Compile(err) => write!(f, "{}", err),
            GenerateError::Io(err) => write!(f, "failed to write shape library: {}", err),
        }
    }
}

impl Error for GenerateError {}

impl From<VerifyError> for GenerateError {
    fn from(err: VerifyError) -> GenerateError {
        GenerateError::Verify(err)
    }
}

impl From<SignatureError> for GenerateError {
    fn from(err: SignatureError) -> GenerateError {
        GenerateError::Signature(err)
    }
}

impl From<CompileError> for GenerateError {
    fn from(err: CompileError) -> GenerateError {
        GenerateError::Compile(err)
    }
}

impl From<io::Error> for GenerateError {
    fn from(err: io::Error) -> GenerateError {
        GenerateError::Io(err)
    }
}

fn render_library_source(asm: &str) -> String {
    format!(
        "\
// This file is auto-generated by the shape library compiler. Do not edit!
// Regenerate it by running `shapegen-cli` with this file's directory.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Return the canonicalized shape function library, serialized as IR text,
/// for embedding in the shape refinement pass.
pub fn shape_library() -> &'static str {{
    r#\"
{}\"#
}}
",
        asm
    )
}

/// Run the whole pipeline and write `ShapeLibrary.rs` into `out_dir`.
///
/// Returns the path of the written artifact. Nothing is written unless
/// every rule verified, every signature conformed and the whole module
/// serialized.
pub fn generate_shape_library(
    catalog: &RuleCatalog,
    registry: &Registry,
    builder: &mut dyn ModuleBuilder,
    out_dir: &Path,
) -> Result<PathBuf, GenerateError> {
    verify::verify_catalog(catalog, registry)?;
    sigcheck::check_catalog(catalog, registry)?;
    for rule in catalog.rules() {
        builder.import_rule(rule)?;
    }
    builder.canonicalize()?;
    let asm = apply_symbol_rewrites(&builder.get_asm());

    let path = out_dir.join(SHAPE_LIBRARY_FILE);
    fs::write(&path, render_library_source(&asm))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{
        apply_symbol_rewrites, escape_symbol, generate_shape_library, IrModuleBuilder,
        ModuleBuilder, SHAPE_LIBRARY_FILE,
    };
    use crate::args::ShapeArg;
    use crate::catalog::catalog;
    use crate::registry::Registry;
    use crate::rules::RuleCatalog;
    use crate::shape_fns::ShapeError;

    fn body(args: &mut [ShapeArg]) -> Result<ShapeArg, ShapeError> {
        Ok(ShapeArg::Ints(args[0].ints()?))
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("shapegen-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_escape_symbol() {
        assert_eq!(
            escape_symbol("__rules__.aten〇topk"),
            "__rules__.aten\\E3\\80\\87topk"
        );
        assert_eq!(escape_symbol("plain_name"), "plain_name");
    }

    #[test]
    fn test_symbol_rewrites() {
        let asm = "func.func @\"__rules__.aten\\E3\\80\\87transpose\\E3\\80\\87int\"() \
                   func.func @\"__rules__.prim\\E3\\80\\87NumToTensor\\E3\\80\\87Scalar\"()";
        let rewritten = apply_symbol_rewrites(asm);
        assert!(rewritten.contains("@\"__shape_fn__.aten.transpose.int\""));
        assert!(rewritten.contains("@\"__shape_fn__.prim.NumToTensor.Scalar\""));
        assert!(!rewritten.contains("__rules__"));
        assert!(!rewritten.contains("\\E3"));
    }

    /// Invert the two fixed rewrites on a rewritten module.
    fn reverse_rewrites(text: &str) -> String {
        let mut out = String::new();
        let mut parts = text.split("@\"");
        out.push_str(parts.next().unwrap());
        for part in parts {
            out.push_str("@\"");
            let Some(end) = part.find('"') else {
                out.push_str(part);
                continue;
            };
            let (symbol, rest) = part.split_at(end);
            let symbol = symbol
                .replace("__shape_fn__.aten", "__rules__.aten")
                .replace("__shape_fn__.prim", "__rules__.prim");
            let restored = match symbol.strip_prefix("__rules__.") {
                Some(name) => format!("__rules__.{}", name.replace('.', "\\E3\\80\\87")),
                None => symbol,
            };
            out.push_str(&restored);
            out.push_str(rest);
        }
        out
    }

    #[test]
    fn test_rewrites_are_reversible() {
        let rules = catalog().unwrap();
        let mut builder = IrModuleBuilder::new();
        for rule in rules.rules() {
            builder.import_rule(rule).unwrap();
        }
        builder.canonicalize().unwrap();
        let raw = builder.get_asm();
        let rewritten = apply_symbol_rewrites(&raw);
        assert_eq!(reverse_rewrites(&rewritten), raw);
    }

    #[test]
    fn test_generate_writes_artifact() {
        let rules = catalog().unwrap();
        let registry = Registry::load().unwrap();
        let mut builder = IrModuleBuilder::new();
        let dir = temp_dir("artifact");
        let path = generate_shape_library(&rules, &registry, &mut builder, &dir).unwrap();
        assert_eq!(path.file_name().unwrap(), SHAPE_LIBRARY_FILE);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("// This file is auto-generated"));
        assert!(contents.contains("SPDX-License-Identifier"));
        assert!(contents.contains("pub fn shape_library() -> &'static str"));
        assert!(contents.contains("@\"__shape_fn__.aten.topk\""));
        assert!(contents.contains("@\"__shape_fn__.prim.NumToTensor.Scalar\""));
        // Exempt rules are compiled too; only signature checking skips them.
        assert!(contents.contains("@\"__shape_fn__.aten.fill.Scalar\""));
        // The separator never survives into the artifact.
        assert!(!contents.contains('〇'));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_no_partial_artifact_on_failure() {
        let registry = Registry::load().unwrap();
        let mut rules = RuleCatalog::new();
        // Signature drift: the registry's tanh takes only `self`.
        rules
            .add(
                "def aten〇tanh(self: List[int], extra: int) -> List[int]:",
                body,
            )
            .unwrap();

        let mut builder = IrModuleBuilder::new();
        let dir = temp_dir("no-partial");
        let result = generate_shape_library(&rules, &registry, &mut builder, &dir);
        assert!(result.is_err());
        assert!(!dir.join(SHAPE_LIBRARY_FILE).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_module_asm_shape() {
        let rules = catalog().unwrap();
        let mut builder = IrModuleBuilder::new();
        builder.import_rule(rules.get("aten〇topk").unwrap()).unwrap();
        let asm = builder.get_asm();
        assert!(asm.starts_with("module {\n"));
        assert!(asm.contains(
            "%0:2 = \"rules.infer\"(%arg0, %arg1, %arg2, %arg3, %arg4) : \
             (!rules.list<int>, !rules.int, !rules.int, !rules.bool, !rules.bool) -> \
             (!rules.list<int>, !rules.list<int>)"
        ));
        assert!(asm.contains("return %0#0, %0#1 : !rules.list<int>, !rules.list<int>"));
    }

    #[test]
    fn test_duplicate_symbol_rejected() {
        let rules = catalog().unwrap();
        let mut builder = IrModuleBuilder::new();
        builder.import_rule(rules.get("aten〇tanh").unwrap()).unwrap();
        assert!(builder.import_rule(rules.get("aten〇tanh").unwrap()).is_err());
    }
}
