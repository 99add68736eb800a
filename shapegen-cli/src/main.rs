use std::collections::VecDeque;
use std::error::Error;
use std::path::PathBuf;

use shapegen::{catalog, generate_shape_library, IrModuleBuilder, Registry};

struct Args {
    /// Directory the shape library is written into.
    out_dir: PathBuf,

    /// Print per-rule progress.
    verbose: bool,
}

fn parse_args() -> Result<Args, lexopt::Error> {
    use lexopt::prelude::*;

    let mut values = VecDeque::new();
    let mut verbose = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Value(val) => values.push_back(val.string()?),
            Short('v') | Long("verbose") => verbose = true,
            Short('h') | Long("help") => {
                println!(
                    "Verify the shape rule catalog and generate the shape library.

Usage: {bin_name} [OPTIONS] <out_dir>

Args:
  <out_dir>      Directory to write ShapeLibrary.rs into

Options:
  -v, --verbose  Print per-rule progress
  -h, --help     Print help
",
                    bin_name = parser.bin_name().unwrap_or("shapegen")
                );
                std::process::exit(0);
            }
            _ => return Err(arg.unexpected()),
        }
    }

    let out_dir = values.pop_front().ok_or("missing `<out_dir>` arg")?;

    Ok(Args {
        out_dir: PathBuf::from(out_dir),
        verbose,
    })
}

/// Tool for generating the embeddable shape function library.
///
/// Verifies every rule in the catalog against its reference operator,
/// checks rule signatures against the operator registry, then compiles the
/// catalog into `ShapeLibrary.rs` in the given directory. Any rule failure
/// aborts the run without writing an artifact.
fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args()?;

    let rules = catalog::catalog()?;
    let registry = Registry::load()?;

    if args.verbose {
        for rule in rules.rules() {
            let status = if rule.is_exempt() {
                "exempt from registry"
            } else if rule.invocations().is_empty() {
                "no invocations"
            } else {
                "verified"
            };
            println!("{}: {} ({} invocations)", rule.name(), status, rule.invocations().len());
        }
    }

    let mut builder = IrModuleBuilder::new();
    let path = generate_shape_library(&rules, &registry, &mut builder, &args.out_dir)?;

    let invocations: usize = rules
        .rules()
        .iter()
        .map(|rule| rule.invocations().len())
        .sum();
    println!(
        "Wrote {} ({} rules, {} registry ops, {} invocations checked)",
        path.display(),
        rules.len(),
        registry.len(),
        invocations,
    );

    Ok(())
}
