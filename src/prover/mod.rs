//! # Associativity Prover
//!
//! Decides whether a reduction update can be reinterpreted as repeated
//! application of an associative binary operator with a known identity, and
//! if so returns the canonicalised operator with its variable bindings.
//!
//! ```text
//! update elements (Exprs)
//!     |
//! [Self-Reference Rewriter]   self-calls -> placeholder vars + dependencies
//!     |
//! [Canonicaliser]             simplify -> CSE -> let substitution -> solve
//!     |
//! independent elements?       yes -> [Single-Element Extractor] per element
//!     |                       no  -> [Dependency Solver] -> minimal subgraphs
//!     |                                 -> [Pattern-Table Matcher] per subgraph
//!     v
//! AssociativeOp { pattern, identities, xs, ys }
//! ```
//!
//! Every failure mode collapses to `AssociativeOp { is_associative: false }`:
//! "could not prove" is an answer, not an error. The typed reasons are
//! surfaced in debug traces only.

mod dependency;
mod rewriter;
pub(crate) mod tables;

use crate::config::ProverConfig;
use crate::cse::common_subexpression_elimination;
use crate::ir::{expr_uses_var, expr_uses_vars, free_vars, BinaryOp, Expr, ScalarType};
use crate::matcher::match_into;
use crate::names::scoped_names;
use crate::simplify::Simplifier;
use crate::solve::solve_expression;
use crate::substitute::{substitute_in_all_lets, substitute_map};
use dependency::DependencyGraph;
use rewriter::SelfRefRewriter;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace};

// ============================================================================
// Result Types
// ============================================================================

/// Binding of a placeholder variable to the concrete subexpression it stands
/// for. An empty `var` with no `expr` encodes "no self-reference at this
/// tuple index".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub var: String,
    pub expr: Option<Expr>,
}

impl Replacement {
    pub fn new(var: impl Into<String>, expr: Expr) -> Self {
        Replacement {
            var: var.into(),
            expr: Some(expr),
        }
    }

    /// The "no self-reference at this tuple index" marker
    pub fn none() -> Self {
        Replacement {
            var: String::new(),
            expr: None,
        }
    }

    pub fn is_defined(&self) -> bool {
        !self.var.is_empty() && self.expr.is_some()
    }
}

/// A known-associative operator template over wildcard variables
/// `x0..x_{N-1}` / `y0..y_{N-1}`, with one identity per tuple element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssociativePattern {
    pub ops: Vec<Expr>,
    pub identities: Vec<Expr>,
    pub is_commutative: bool,
}

impl AssociativePattern {
    pub fn new(ops: Vec<Expr>, identities: Vec<Expr>, is_commutative: bool) -> Self {
        assert_eq!(
            ops.len(),
            identities.len(),
            "one identity per pattern operator"
        );
        AssociativePattern {
            ops,
            identities,
            is_commutative,
        }
    }

    pub fn single(op: Expr, identity: Expr, is_commutative: bool) -> Self {
        Self::new(vec![op], vec![identity], is_commutative)
    }

    pub fn arity(&self) -> usize {
        self.ops.len()
    }
}

/// The prover's verdict. When `is_associative` is false the other fields are
/// meaningless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AssociativeOp {
    pub pattern: AssociativePattern,
    pub xs: Vec<Replacement>,
    pub ys: Vec<Replacement>,
    pub is_associative: bool,
}

impl AssociativeOp {
    pub fn associative(&self) -> bool {
        self.is_associative
    }

    pub fn pattern(&self) -> &AssociativePattern {
        &self.pattern
    }

    pub fn xs(&self) -> &[Replacement] {
        &self.xs
    }

    pub fn ys(&self) -> &[Replacement] {
        &self.ys
    }
}

// ============================================================================
// Failure Reasons
// ============================================================================

/// Why a proof attempt was abandoned. Never escapes `prove_associativity`;
/// logged at debug level and collapsed to a non-associative verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProveFailure {
    #[error("self-call argument tuple differs from the definition's arguments")]
    MismatchedCallArgs,
    #[error("self-call with a non-internal call kind")]
    NonInternalSelfCall,
    #[error("the update is conditional on its own value")]
    ConditionalSelfReference,
    #[error("element {0} matches no associative operator or table pattern")]
    NoPatternMatch(usize),
    #[error("no pattern table for {0} elements of type {1}")]
    NoTable(usize, ScalarType),
    #[error("dependency subgraph {0:?} exceeds the supported size")]
    SubgraphTooLarge(Vec<usize>),
    #[error("overlapping subgraphs disagree at element {0}")]
    InconsistentSubgraphs(usize),
}

// ============================================================================
// Prover
// ============================================================================

/// The associativity prover. Pure per invocation; a single instance can be
/// shared freely across threads.
pub struct Prover {
    max_subgraph_size: usize,
    simplifier: Simplifier,
}

impl Prover {
    pub fn new() -> Self {
        Prover {
            max_subgraph_size: 2,
            simplifier: Simplifier::new(),
        }
    }

    pub fn from_config(config: &ProverConfig) -> Self {
        Prover {
            max_subgraph_size: config.max_subgraph_size,
            simplifier: Simplifier::with_max_iterations(config.simplify_iterations),
        }
    }

    /// Prove whether the update `func(args) = exprs` is a sequence of
    /// applications of an associative operator.
    pub fn prove(&self, func: &str, args: &[Expr], exprs: &[Expr]) -> AssociativeOp {
        match self.try_prove(func, args, exprs) {
            Ok(op) => op,
            Err(reason) => {
                debug!(func, %reason, "associativity proof failed");
                AssociativeOp::default()
            }
        }
    }

    fn try_prove(
        &self,
        func: &str,
        args: &[Expr],
        exprs: &[Expr],
    ) -> Result<AssociativeOp, ProveFailure> {
        let n = exprs.len();
        assert!(n > 0, "an update definition has at least one element");

        // canonicalise the definition's argument tuple once up front
        let args: Vec<Expr> = args
            .iter()
            .map(|a| self.simplifier.simplify(&substitute_in_all_lets(a)))
            .collect();

        // placeholder names are deterministic per input, so repeated proofs
        // of the same update return structurally equal results
        let mut used: HashSet<String> = HashSet::new();
        for e in exprs {
            used.extend(free_vars(e));
        }
        for a in &args {
            used.extend(free_vars(a));
        }
        let op_x_names = scoped_names('x', n, &used);
        let op_y_names = scoped_names('y', n, &used);

        let mut rewritten: Vec<Option<Expr>> = vec![None; n];
        let mut x_parts: Vec<Option<Expr>> = vec![None; n];
        let mut deps: Vec<HashSet<usize>> = vec![HashSet::new(); n];

        // high-to-low, the order least likely to collide with user names
        for i in (0..n).rev() {
            let e = substitute_in_all_lets(&common_subexpression_elimination(
                &self.simplifier.simplify(&exprs[i]),
            ));
            let outcome = SelfRefRewriter::new(func, &args, i, &op_x_names).rewrite(&e);
            if !outcome.is_solvable() {
                return Err(outcome
                    .failure
                    .expect("an unsolvable element carries its failure reason"));
            }
            trace!(element = i, expr = %outcome.expr, "self-references rewritten");
            let canonical = self.canonicalise(&outcome.expr, &op_x_names[i], outcome.x_part.is_some());
            trace!(element = i, expr = %canonical, "canonicalised");
            rewritten[i] = Some(canonical);
            x_parts[i] = outcome.x_part;
            deps[i] = outcome.x_dependencies;
        }
        let exprs: Vec<Expr> = rewritten
            .into_iter()
            .map(|e| e.expect("every element was rewritten"))
            .collect();

        let mut graph = DependencyGraph::new(deps);
        graph.transitive_closure();

        let result = if n == 1 || !graph.has_cross_edges() {
            self.prove_independent(&exprs, &x_parts, &op_x_names, &op_y_names)?
        } else {
            self.prove_joint(&graph, &exprs, &x_parts, &op_x_names, &op_y_names)?
        };
        debug_validate(&result, &op_x_names);
        Ok(result)
    }

    /// Simplify, CSE, let substitution, then isolate the placeholder on the
    /// left. A solver failure is not fatal; matching proceeds on the
    /// unsolved form.
    fn canonicalise(&self, expr: &Expr, x_name: &str, has_x_part: bool) -> Expr {
        let e = self.simplifier.simplify(expr);
        let e = common_subexpression_elimination(&e);
        let e = substitute_in_all_lets(&e);
        if !has_x_part {
            return e;
        }
        let solved = solve_expression(&e, x_name);
        if solved.failed {
            trace!(var = x_name, expr = %e, "linear solve failed; continuing unsolved");
        }
        solved.result
    }

    /// Independent case: prove each element on its own
    fn prove_independent(
        &self,
        exprs: &[Expr],
        x_parts: &[Option<Expr>],
        op_x_names: &[String],
        op_y_names: &[String],
    ) -> Result<AssociativeOp, ProveFailure> {
        let n = exprs.len();
        let mut ops = Vec::with_capacity(n);
        let mut identities = Vec::with_capacity(n);
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        let mut is_commutative = true;

        for i in 0..n {
            let element = self.prove_single(
                i,
                &exprs[i],
                x_parts[i].as_ref(),
                &op_x_names[i],
                &op_y_names[i],
            )?;
            ops.push(element.op);
            identities.push(element.identity);
            xs.push(element.x);
            ys.push(element.y);
            is_commutative &= element.is_commutative;
        }

        Ok(AssociativeOp {
            pattern: AssociativePattern::new(ops, identities, is_commutative),
            xs,
            ys,
            is_associative: true,
        })
    }

    /// Recognise the built-in operator forms, falling back to the
    /// single-element table for 32-bit signed elements
    fn prove_single(
        &self,
        index: usize,
        expr: &Expr,
        x_part: Option<&Expr>,
        x_name: &str,
        y_name: &str,
    ) -> Result<SingleElement, ProveFailure> {
        let Some(x_part) = x_part else {
            // no self-reference: the whole element is the y operand and the
            // operator degenerates to "replace with y"
            let Some(ty) = expr.try_scalar_type() else {
                return Err(ProveFailure::NoPatternMatch(index));
            };
            return Ok(SingleElement {
                op: Expr::Var {
                    name: y_name.to_string(),
                    ty,
                },
                identity: ty.zero_expr(),
                x: Replacement::none(),
                y: Replacement::new(y_name, expr.clone()),
                is_commutative: false,
            });
        };

        if let Expr::Binary { op, left, right } = expr {
            if left.as_var() == Some(x_name) && !expr_uses_var(right, x_name) {
                if let Some(element) =
                    builtin_single(*op, expr.scalar_type(), x_name, y_name, x_part, right, &self.simplifier)
                {
                    return Ok(element);
                }
            }
        }

        let ty = expr.scalar_type();
        if ty == ScalarType::Int(32) {
            if let Some(table) = tables::table_for(ty, 1) {
                let exprs = std::slice::from_ref(expr);
                let x_parts = [Some(x_part.clone())];
                let x_names = [x_name.to_string()];
                let y_names = [y_name.to_string()];
                if let Some(found) = find_table_match(table, exprs, &x_parts, &x_names, &y_names) {
                    return Ok(SingleElement {
                        op: found.ops.into_iter().next().expect("arity 1"),
                        identity: found.identities.into_iter().next().expect("arity 1"),
                        x: found.xs.into_iter().next().expect("arity 1"),
                        y: found.ys.into_iter().next().expect("arity 1"),
                        is_commutative: found.is_commutative,
                    });
                }
            }
        }

        Err(ProveFailure::NoPatternMatch(index))
    }

    /// Joint proof per minimal dependency subgraph, merged with field-wise
    /// consistency checks
    fn prove_joint(
        &self,
        graph: &DependencyGraph,
        exprs: &[Expr],
        x_parts: &[Option<Expr>],
        op_x_names: &[String],
        op_y_names: &[String],
    ) -> Result<AssociativeOp, ProveFailure> {
        let n = graph.len();
        let subgraphs = graph.minimal_subgraphs();
        debug!(?subgraphs, "proving jointly over minimal subgraphs");

        let mut ops: Vec<Option<Expr>> = vec![None; n];
        let mut identities: Vec<Option<Expr>> = vec![None; n];
        let mut xs: Vec<Option<Replacement>> = vec![None; n];
        let mut ys: Vec<Option<Replacement>> = vec![None; n];
        let mut is_commutative = true;

        for subgraph in &subgraphs {
            if subgraph.len() > self.max_subgraph_size {
                return Err(ProveFailure::SubgraphTooLarge(subgraph.clone()));
            }

            let sub_exprs: Vec<Expr> = subgraph.iter().map(|&i| exprs[i].clone()).collect();
            let sub_x_parts: Vec<Option<Expr>> =
                subgraph.iter().map(|&i| x_parts[i].clone()).collect();
            let sub_x_names: Vec<String> =
                subgraph.iter().map(|&i| op_x_names[i].clone()).collect();
            let sub_y_names: Vec<String> =
                subgraph.iter().map(|&i| op_y_names[i].clone()).collect();

            let ty = match sub_exprs[0].try_scalar_type() {
                Some(ty) => ty,
                None => return Err(ProveFailure::NoPatternMatch(subgraph[0])),
            };
            if sub_exprs.iter().any(|e| e.try_scalar_type() != Some(ty)) {
                return Err(ProveFailure::NoTable(subgraph.len(), ty));
            }
            let table = tables::table_for(ty, subgraph.len())
                .ok_or_else(|| ProveFailure::NoTable(subgraph.len(), ty))?;

            let found =
                find_table_match(table, &sub_exprs, &sub_x_parts, &sub_x_names, &sub_y_names)
                    .ok_or(ProveFailure::NoPatternMatch(subgraph[0]))?;
            is_commutative &= found.is_commutative;

            for (local, &global) in subgraph.iter().enumerate() {
                merge_slot(&mut ops[global], found.ops[local].clone(), global)?;
                merge_slot(
                    &mut identities[global],
                    found.identities[local].clone(),
                    global,
                )?;
                merge_slot(&mut xs[global], found.xs[local].clone(), global)?;
                merge_slot(&mut ys[global], found.ys[local].clone(), global)?;
            }
        }

        let collect = |slots: Vec<Option<Expr>>| -> Vec<Expr> {
            slots
                .into_iter()
                .map(|s| s.expect("every element is covered by a minimal subgraph"))
                .collect()
        };
        let ops = collect(ops);
        let identities = collect(identities);
        let xs: Vec<Replacement> = xs
            .into_iter()
            .map(|s| s.expect("every element is covered by a minimal subgraph"))
            .collect();
        let ys: Vec<Replacement> = ys
            .into_iter()
            .map(|s| s.expect("every element is covered by a minimal subgraph"))
            .collect();

        Ok(AssociativeOp {
            pattern: AssociativePattern::new(ops, identities, is_commutative),
            xs,
            ys,
            is_associative: true,
        })
    }
}

impl Default for Prover {
    fn default() -> Self {
        Self::new()
    }
}

/// Prove with default settings. See [`Prover`] for configuration.
pub fn prove_associativity(func: &str, args: &[Expr], exprs: &[Expr]) -> AssociativeOp {
    Prover::new().prove(func, args, exprs)
}

// ============================================================================
// Single-Element Extraction
// ============================================================================

struct SingleElement {
    op: Expr,
    identity: Expr,
    x: Replacement,
    y: Replacement,
    is_commutative: bool,
}

fn builtin_single(
    op: BinaryOp,
    ty: ScalarType,
    x_name: &str,
    y_name: &str,
    x_part: &Expr,
    rhs: &Expr,
    simplifier: &Simplifier,
) -> Option<SingleElement> {
    use BinaryOp::*;
    let (canonical_op, identity, y_expr, is_commutative) = match op {
        Add => (Add, ty.zero_expr(), rhs.clone(), true),
        // x - r is reported as x + y with y = -r; the normalised operator is
        // associative but the report stays non-commutative
        Sub => {
            let negated = simplifier.simplify(&Expr::Binary {
                op: Sub,
                left: Box::new(ty.zero_expr()),
                right: Box::new(rhs.clone()),
            });
            (Add, ty.zero_expr(), negated, false)
        }
        Mul => (Mul, ty.one_expr(), rhs.clone(), true),
        Min => (Min, ty.max_expr(), rhs.clone(), true),
        Max => (Max, ty.min_expr(), rhs.clone(), true),
        And if ty.is_bool() => (And, ty.one_expr(), rhs.clone(), true),
        Or if ty.is_bool() => (Or, ty.zero_expr(), rhs.clone(), true),
        _ => return None,
    };
    let x_var = Expr::Var {
        name: x_name.to_string(),
        ty,
    };
    let y_var = Expr::Var {
        name: y_name.to_string(),
        ty,
    };
    Some(SingleElement {
        op: Expr::Binary {
            op: canonical_op,
            left: Box::new(x_var),
            right: Box::new(y_var),
        },
        identity,
        x: Replacement::new(x_name, x_part.clone()),
        y: Replacement::new(y_name, y_expr),
        is_commutative,
    })
}

// ============================================================================
// Pattern-Table Matching
// ============================================================================

struct TableMatch {
    ops: Vec<Expr>,
    identities: Vec<Expr>,
    is_commutative: bool,
    xs: Vec<Replacement>,
    ys: Vec<Replacement>,
}

/// Match a sequence of elements against a table, first hit wins.
///
/// Bindings accumulate across the elements of one candidate: a wildcard
/// rebound to a different expression rejects the candidate. Every bound
/// `x<i>` must be exactly the declared placeholder variable, and every bound
/// `y<i>` must be independent of all placeholders.
fn find_table_match(
    table: &[AssociativePattern],
    exprs: &[Expr],
    x_parts: &[Option<Expr>],
    op_x_names: &[String],
    op_y_names: &[String],
) -> Option<TableMatch> {
    let n = exprs.len();
    let x_scope: HashSet<String> = op_x_names.iter().cloned().collect();

    'candidates: for pattern in table {
        if pattern.arity() != n {
            continue;
        }
        let mut bindings: HashMap<String, Expr> = HashMap::new();
        for i in 0..n {
            if !match_into(&pattern.ops[i], &exprs[i], &mut bindings) {
                continue 'candidates;
            }
        }

        for (i, x_name) in op_x_names.iter().enumerate() {
            if let Some(bound) = bindings.get(&format!("x{i}")) {
                if bound.as_var() != Some(x_name.as_str()) {
                    continue 'candidates;
                }
            }
        }

        let mut y_bindings: Vec<Option<Expr>> = Vec::with_capacity(n);
        for i in 0..n {
            match bindings.get(&format!("y{i}")) {
                Some(y) => {
                    if expr_uses_vars(y, &x_scope) {
                        continue 'candidates;
                    }
                    y_bindings.push(Some(y.clone()));
                }
                None => y_bindings.push(None),
            }
        }

        // rebuild the canonical operator by renaming every wildcard in one
        // simultaneous pass; sequential substitution could capture when one
        // y-binding's expression appears inside another's
        let mut rename: HashMap<String, Expr> = HashMap::new();
        for i in 0..n {
            if let Some(bound) = bindings.get(&format!("x{i}")) {
                rename.insert(
                    format!("x{i}"),
                    Expr::Var {
                        name: op_x_names[i].clone(),
                        ty: bound.scalar_type(),
                    },
                );
            }
            if let Some(y) = &y_bindings[i] {
                rename.insert(
                    format!("y{i}"),
                    Expr::Var {
                        name: op_y_names[i].clone(),
                        ty: y.scalar_type(),
                    },
                );
            }
        }
        let ops: Vec<Expr> = pattern
            .ops
            .iter()
            .map(|op| substitute_map(&rename, op))
            .collect();

        let xs: Vec<Replacement> = x_parts
            .iter()
            .enumerate()
            .map(|(i, part)| match part {
                Some(expr) => Replacement::new(&op_x_names[i], expr.clone()),
                None => Replacement::none(),
            })
            .collect();
        let ys: Vec<Replacement> = y_bindings
            .into_iter()
            .enumerate()
            .map(|(i, y)| match y {
                Some(expr) => Replacement::new(&op_y_names[i], expr),
                None => Replacement::none(),
            })
            .collect();

        trace!(op = %pattern.ops[0], "table pattern matched");
        return Some(TableMatch {
            ops,
            identities: pattern.identities.clone(),
            is_commutative: pattern.is_commutative,
            xs,
            ys,
        });
    }
    None
}

// ============================================================================
// Merging and Validation
// ============================================================================

/// Fill a per-element slot, or check a later subgraph's value against an
/// earlier write
fn merge_slot<T: PartialEq>(
    slot: &mut Option<T>,
    value: T,
    index: usize,
) -> Result<(), ProveFailure> {
    match slot {
        Some(existing) if *existing != value => Err(ProveFailure::InconsistentSubgraphs(index)),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

/// Contract checks over a successful result; a violation is a prover bug,
/// not an input property
fn debug_validate(op: &AssociativeOp, op_x_names: &[String]) {
    debug_assert_eq!(op.pattern.ops.len(), op.xs.len());
    debug_assert_eq!(op.pattern.ops.len(), op.ys.len());
    debug_assert_eq!(op.pattern.ops.len(), op.pattern.identities.len());
    let x_scope: HashSet<String> = op_x_names.iter().cloned().collect();
    for y in &op.ys {
        if let Some(expr) = &y.expr {
            debug_assert!(
                !expr_uses_vars(expr, &x_scope),
                "y-binding {expr} depends on a self-reference placeholder"
            );
        }
    }
}
