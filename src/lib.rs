//! # Arraylang Associativity Prover
//!
//! The algorithmic core of an array-language compiler: given the update
//! definition of a reduction, decide whether it can be reinterpreted as
//! repeated application of an *associative* binary operator with a known
//! identity. A positive answer licenses downstream stages to reorder,
//! split and parallelise the reduction.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Update definition f(args) = exprs
//!     ↓
//! [Self-Reference Rewriter]     → placeholder vars + dependency sets
//!     ↓
//! [Canonicaliser]               → simplify → CSE → let substitution → solve
//!     ↓
//! [Single-Element Extractor]      (independent elements)
//!    or
//! [Dependency Solver → Matcher]   (cross-referencing tuple elements)
//!     ↓
//! AssociativeOp { pattern, identities, xs, ys }
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use arraylang::ir::builders::*;
//! use arraylang::{prove_associativity, ScalarType};
//!
//! // f(r) = y + z + f(r)  — a sum reduction
//! let update = add(
//!     add(ivar("y"), ivar("z")),
//!     self_call("f", vec![ivar("r")], 0, ScalarType::Int(32)),
//! );
//! let result = prove_associativity("f", &[ivar("r")], &[update]);
//! assert!(result.associative());
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `ir` | Expression trees, scalar types, structural equality |
//! | `simplify` | Algebraic simplification to fixpoint |
//! | `cse` | Common subexpression elimination |
//! | `substitute` | Substitution and `Let` expansion |
//! | `solve` | Single-variable linear solve (variable to the left) |
//! | `matcher` | Wildcard term matching |
//! | `names` | Fresh-name generation |
//! | `prover` | Self-reference rewriting, dependency analysis, proof |
//! | `config` | Configuration system |
//!
//! The prover is purely functional and single-threaded per invocation: all
//! inputs are read-only, every rewrite builds fresh nodes, and concurrent
//! invocations need no coordination.

pub mod config;
pub mod cse;
pub mod ir;
pub mod matcher;
pub mod names;
pub mod prover;
pub mod simplify;
pub mod solve;
pub mod substitute;

// Re-export the IR surface
pub use ir::{
    equal, expr_uses_var, expr_uses_vars, free_vars, BinaryOp, CallKind, CmpOp, Expr, ScalarType,
};

// Re-export the canonicalisation passes
pub use cse::common_subexpression_elimination;
pub use simplify::{simplify, Simplifier};
pub use solve::{solve_expression, SolveResult};
pub use substitute::{substitute, substitute_in_all_lets, substitute_map};

// Re-export matching and naming
pub use matcher::expr_match;
pub use names::unique_name;

// Re-export the prover
pub use prover::{
    prove_associativity, AssociativeOp, AssociativePattern, Prover, Replacement,
};

// Re-export configuration
pub use config::{Config, LoggingConfig, ProverConfig};
