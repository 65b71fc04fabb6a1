//! Debug driver for the associativity prover.
//!
//! Runs the prover over a set of built-in sample updates and prints the
//! canonicalised operator, identity and bindings for each, so a change to
//! the canonicaliser or the pattern tables can be eyeballed quickly.

use anyhow::Result;
use arraylang::ir::builders::*;
use arraylang::{AssociativeOp, Config, Expr, Prover, ScalarType};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "debug_prover",
    about = "Run the associativity prover over built-in sample updates"
)]
struct Args {
    /// Sample to run: sum, max, min-cast, non-assoc, complex-mul, argmin, all
    #[arg(default_value = "all")]
    sample: String,

    /// Emit results as JSON
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const I32: ScalarType = ScalarType::Int(32);

fn f(index: usize) -> Expr {
    self_call("f", vec![ivar("r")], index, I32)
}

fn g(index: usize) -> Expr {
    extern_call("g", vec![ivar("rx")], index, I32)
}

fn samples() -> Vec<(&'static str, Vec<Expr>)> {
    vec![
        ("sum", vec![add(add(ivar("y"), ivar("z")), f(0))]),
        ("max", vec![max(ivar("y"), f(0))]),
        (
            "min-cast",
            vec![min(
                self_call("f", vec![ivar("r")], 0, ScalarType::Int(16)),
                add(
                    var("y", ScalarType::Int(16)),
                    cast(ScalarType::Int(16), ivar("z")),
                ),
            )],
        ),
        ("non-assoc", vec![max(add(f(0), g(0)), g(0))]),
        (
            "complex-mul",
            vec![
                sub(mul(f(0), g(0)), mul(f(1), g(1))),
                add(mul(f(0), g(1)), mul(f(1), g(0))),
            ],
        ),
        (
            "argmin",
            vec![
                min(f(0), g(0)),
                select(lt(f(0), g(0)), f(1), ivar("rx")),
            ],
        ),
    ]
}

fn print_result(name: &str, result: &AssociativeOp) {
    if !result.associative() {
        println!("{name}: not provably associative");
        return;
    }
    println!("{name}: associative (commutative: {})", result.pattern.is_commutative);
    for i in 0..result.pattern.ops.len() {
        println!(
            "  op[{i}] = {}   identity = {}",
            result.pattern.ops[i], result.pattern.identities[i]
        );
        if result.xs[i].is_defined() {
            println!(
                "    {} <- {}",
                result.xs[i].var,
                result.xs[i].expr.as_ref().expect("defined")
            );
        }
        if result.ys[i].is_defined() {
            println!(
                "    {} <- {}",
                result.ys[i].var,
                result.ys[i].expr.as_ref().expect("defined")
            );
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load().unwrap_or_default();

    let default_filter = match args.verbose {
        0 => config.logging.level.clone(),
        1 => "arraylang=debug".to_string(),
        _ => "arraylang=trace".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let prover = Prover::from_config(&config.prover);
    let lhs_args = [ivar("r")];
    for (name, exprs) in samples() {
        if args.sample != "all" && args.sample != name {
            continue;
        }
        let result = prover.prove("f", &lhs_args, &exprs);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(name, &result);
        }
    }
    Ok(())
}
