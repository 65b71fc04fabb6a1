//! Self-Reference Rewriter
//!
//! Replaces each matching self-call in an update element by its placeholder
//! variable, records which tuple indices the element depends on, and rejects
//! the shapes the prover cannot handle: argument tuples that differ from the
//! definition's, non-internal self-calls, and a self-call at the element's
//! own index inside a `select` condition (the update would be conditional on
//! its own value).
//!
//! The in-condition flag is an explicit parameter of the recursive visit, so
//! it cannot leak across sibling subtrees: `select` descends its condition
//! with the flag raised and its branches with the flag it was given.

use super::ProveFailure;
use crate::ir::{CallKind, Expr};
use std::collections::HashSet;

/// Outcome of rewriting one update element
#[derive(Debug, Clone)]
pub(crate) struct RewriteOutcome {
    /// The element with self-calls replaced by placeholder variables
    pub expr: Expr,
    /// The original self-call at the element's own index, if present
    pub x_part: Option<Expr>,
    /// Every tuple index this element references (its own included)
    pub x_dependencies: HashSet<usize>,
    /// Set when the element was rejected; `expr`/`x_part` are meaningless
    pub failure: Option<ProveFailure>,
}

impl RewriteOutcome {
    pub fn is_solvable(&self) -> bool {
        self.failure.is_none()
    }
}

/// Rewriter state for a single update element
pub(crate) struct SelfRefRewriter<'a> {
    func: &'a str,
    lhs_args: &'a [Expr],
    value_index: usize,
    op_x_names: &'a [String],
    x_part: Option<Expr>,
    x_dependencies: HashSet<usize>,
    failure: Option<ProveFailure>,
}

impl<'a> SelfRefRewriter<'a> {
    pub fn new(
        func: &'a str,
        lhs_args: &'a [Expr],
        value_index: usize,
        op_x_names: &'a [String],
    ) -> Self {
        SelfRefRewriter {
            func,
            lhs_args,
            value_index,
            op_x_names,
            x_part: None,
            x_dependencies: HashSet::new(),
            failure: None,
        }
    }

    pub fn rewrite(mut self, expr: &Expr) -> RewriteOutcome {
        let rewritten = self.visit(expr, false);
        RewriteOutcome {
            expr: rewritten,
            x_part: self.x_part,
            x_dependencies: self.x_dependencies,
            failure: self.failure,
        }
    }

    fn fail(&mut self, reason: ProveFailure) {
        if self.failure.is_none() {
            self.failure = Some(reason);
        }
    }

    fn visit(&mut self, expr: &Expr, in_condition: bool) -> Expr {
        if self.failure.is_some() {
            // rejected: stop rewriting, the caller discards the result
            return expr.clone();
        }
        match expr {
            Expr::Call {
                name,
                args,
                value_index: index,
                kind,
                ty,
            } if name == self.func => {
                if *kind != CallKind::Internal {
                    self.fail(ProveFailure::NonInternalSelfCall);
                    return expr.clone();
                }
                let args_match = args.len() == self.lhs_args.len()
                    && args.iter().zip(self.lhs_args).all(|(a, b)| a == b);
                if !args_match {
                    self.fail(ProveFailure::MismatchedCallArgs);
                    return expr.clone();
                }
                if in_condition && *index == self.value_index {
                    self.fail(ProveFailure::ConditionalSelfReference);
                    return expr.clone();
                }
                assert!(
                    *index < self.op_x_names.len(),
                    "self-call value index {index} out of range for a {}-element update",
                    self.op_x_names.len()
                );
                if *index == self.value_index && self.x_part.is_none() {
                    self.x_part = Some(expr.clone());
                }
                self.x_dependencies.insert(*index);
                Expr::Var {
                    name: self.op_x_names[*index].clone(),
                    ty: *ty,
                }
            }
            Expr::Select {
                cond,
                if_true,
                if_false,
            } => {
                let cond = self.visit(cond, true);
                let if_true = self.visit(if_true, in_condition);
                let if_false = self.visit(if_false, in_condition);
                Expr::Select {
                    cond: Box::new(cond),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                }
            }
            _ => expr.map_children(&mut |c| self.visit(c, in_condition)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builders::*;
    use crate::ir::ScalarType;

    const I32: ScalarType = ScalarType::Int(32);

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("_x_{i}")).collect()
    }

    fn f(index: usize) -> Expr {
        self_call("f", vec![ivar("r")], index, I32)
    }

    #[test]
    fn test_self_call_becomes_placeholder() {
        let args = [ivar("r")];
        let xs = names(1);
        let outcome =
            SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&add(ivar("y"), f(0)));
        assert!(outcome.is_solvable());
        assert_eq!(outcome.expr, add(ivar("y"), ivar("_x_0")));
        assert_eq!(outcome.x_part, Some(f(0)));
        assert_eq!(outcome.x_dependencies, [0].into_iter().collect());
    }

    #[test]
    fn test_repeated_self_call_shares_one_placeholder() {
        let args = [ivar("r")];
        let xs = names(1);
        let outcome =
            SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&add(f(0), mul(f(0), ivar("y"))));
        assert!(outcome.is_solvable());
        assert_eq!(
            outcome.expr,
            add(ivar("_x_0"), mul(ivar("_x_0"), ivar("y")))
        );
    }

    #[test]
    fn test_cross_index_dependency_is_recorded() {
        let args = [ivar("r")];
        let xs = names(2);
        // element 0 references only f(r)[1]: a dependency, but no own x_part
        let outcome =
            SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&add(f(1), ivar("g")));
        assert!(outcome.is_solvable());
        assert_eq!(outcome.expr, add(ivar("_x_1"), ivar("g")));
        assert_eq!(outcome.x_part, None);
        assert_eq!(outcome.x_dependencies, [1].into_iter().collect());
    }

    #[test]
    fn test_mismatched_args_reject() {
        let args = [ivar("r")];
        let xs = names(1);
        let stray = self_call("f", vec![ivar("s")], 0, I32);
        let outcome = SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&add(stray, ivar("y")));
        assert!(!outcome.is_solvable());
        assert_eq!(outcome.failure, Some(ProveFailure::MismatchedCallArgs));
    }

    #[test]
    fn test_non_internal_self_call_rejects() {
        let args = [ivar("r")];
        let xs = names(1);
        let external = extern_call("f", vec![ivar("r")], 0, I32);
        let outcome = SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&add(external, ivar("y")));
        assert!(!outcome.is_solvable());
        assert_eq!(outcome.failure, Some(ProveFailure::NonInternalSelfCall));
    }

    #[test]
    fn test_own_index_in_condition_rejects() {
        let args = [ivar("r")];
        let xs = names(1);
        let e = select(lt(f(0), int32(0)), int32(0), ivar("y"));
        let outcome = SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&e);
        assert!(!outcome.is_solvable());
        assert_eq!(outcome.failure, Some(ProveFailure::ConditionalSelfReference));
    }

    #[test]
    fn test_other_index_in_condition_is_allowed() {
        let args = [ivar("r")];
        let xs = names(2);
        // proving element 1: f(r)[0] in the condition is a cross dependency
        let e = select(lt(f(0), ivar("g")), f(1), ivar("rx"));
        let outcome = SelfRefRewriter::new("f", &args, 1, &xs).rewrite(&e);
        assert!(outcome.is_solvable());
        assert_eq!(
            outcome.expr,
            select(lt(ivar("_x_0"), ivar("g")), ivar("_x_1"), ivar("rx"))
        );
        assert_eq!(outcome.x_part, Some(f(1)));
        assert_eq!(outcome.x_dependencies, [0, 1].into_iter().collect());
    }

    #[test]
    fn test_own_index_in_branch_is_allowed() {
        let args = [ivar("r")];
        let xs = names(1);
        let e = select(lt(ivar("g"), int32(0)), f(0), ivar("y"));
        let outcome = SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&e);
        assert!(outcome.is_solvable());
        assert_eq!(outcome.x_part, Some(f(0)));
    }

    #[test]
    fn test_nested_select_condition_still_rejects() {
        let args = [ivar("r")];
        let xs = names(1);
        // f(r)[0] sits in a branch of an inner select that is itself the
        // condition of the outer select: still lexically inside a condition
        let inner = select(lt(ivar("g"), int32(0)), lt(f(0), int32(1)), bool_lit(true));
        let e = select(inner, ivar("y"), ivar("z"));
        let outcome = SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&e);
        assert!(!outcome.is_solvable());
    }

    #[test]
    fn test_unrelated_calls_recurse() {
        let args = [ivar("r")];
        let xs = names(1);
        // g is not the function being defined; its argument still rewrites
        let e = extern_call("g", vec![f(0)], 0, I32);
        let outcome = SelfRefRewriter::new("f", &args, 0, &xs).rewrite(&e);
        assert!(outcome.is_solvable());
        assert_eq!(
            outcome.expr,
            extern_call("g", vec![ivar("_x_0")], 0, I32)
        );
    }
}
