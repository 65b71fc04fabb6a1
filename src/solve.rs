//! Single-Variable Linear Solve
//!
//! `solve_expression(e, v)` rewrites `e` so that the variable `v` surfaces
//! as the left operand of the outermost operator: `max(y, v)` becomes
//! `max(v, y)` and `(a + v) + b` becomes `v + (a + b)`. It succeeds when `v`
//! occurs exactly once along a spine of commutative/associative operators
//! (`Sub` spines mix in through add/sub rebalancing). On failure the input
//! is returned unchanged with `failed` set; callers carry on with the
//! original expression.

use crate::ir::{expr_uses_var, BinaryOp, Expr};

/// Outcome of a solve attempt
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// The rewritten expression, or the unchanged input on failure
    pub result: Expr,
    /// Whether the variable could not be isolated
    pub failed: bool,
}

/// Rewrite `expr` so `var` appears as the left operand of the outermost
/// operator where possible.
pub fn solve_expression(expr: &Expr, var: &str) -> SolveResult {
    match solve(expr, var) {
        Some(result) => SolveResult {
            result,
            failed: false,
        },
        None => SolveResult {
            result: expr.clone(),
            failed: true,
        },
    }
}

fn solve(expr: &Expr, var: &str) -> Option<Expr> {
    match expr {
        Expr::Var { name, .. } if name == var => Some(expr.clone()),
        Expr::Binary { op, left, right } => {
            let in_left = expr_uses_var(left, var);
            let in_right = expr_uses_var(right, var);
            match (in_left, in_right) {
                // the variable must occur exactly once along the spine
                (true, true) | (false, false) => None,
                (true, false) => {
                    let solved = solve(left, var)?;
                    Some(rebalance(*op, solved, right))
                }
                (false, true) => {
                    if !op.is_commutative() {
                        return None;
                    }
                    let solved = solve(right, var)?;
                    Some(rebalance(*op, solved, left))
                }
            }
        }
        _ => None,
    }
}

/// Combine a solved left operand (variable leftmost, right side free of it)
/// with the free remainder, hoisting the variable through compatible
/// operator pairs: `(v op r) op rest` becomes `v op (r op rest)`.
fn rebalance(op: BinaryOp, solved: Expr, rest: &Expr) -> Expr {
    if let Expr::Binary {
        op: inner,
        left,
        right,
    } = &solved
    {
        use BinaryOp::{Add, Sub};
        let hoisted = match (*inner, op) {
            // same associative operator on both levels
            (a, b) if a == b && b.is_associative() => {
                Some(binary(op, (**left).clone(), binary(op, (**right).clone(), rest.clone())))
            }
            // (v + r) - rest  ==  v + (r - rest)
            (Add, Sub) => Some(binary(
                Add,
                (**left).clone(),
                binary(Sub, (**right).clone(), rest.clone()),
            )),
            // (v - r) - rest  ==  v - (r + rest)
            (Sub, Sub) => Some(binary(
                Sub,
                (**left).clone(),
                binary(Add, (**right).clone(), rest.clone()),
            )),
            // (v - r) + rest  ==  v + (rest - r)
            (Sub, Add) => Some(binary(
                Add,
                (**left).clone(),
                binary(Sub, rest.clone(), (**right).clone()),
            )),
            _ => None,
        };
        if let Some(e) = hoisted {
            return e;
        }
    }
    binary(op, solved, rest.clone())
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builders::*;

    #[test]
    fn test_commutes_variable_leftward() {
        let r = solve_expression(&add(add(ivar("y"), ivar("z")), ivar("v")), "v");
        assert!(!r.failed);
        assert_eq!(r.result, add(ivar("v"), add(ivar("y"), ivar("z"))));

        let r = solve_expression(&max(ivar("y"), ivar("v")), "v");
        assert!(!r.failed);
        assert_eq!(r.result, max(ivar("v"), ivar("y")));
    }

    #[test]
    fn test_hoists_through_same_operator() {
        // (a + v) + b -> v + (a + b)
        let r = solve_expression(&add(add(ivar("a"), ivar("v")), ivar("b")), "v");
        assert!(!r.failed);
        assert_eq!(r.result, add(ivar("v"), add(ivar("a"), ivar("b"))));
    }

    #[test]
    fn test_add_sub_rebalancing() {
        // (a + v) - b -> v + (a - b)
        let r = solve_expression(&sub(add(ivar("a"), ivar("v")), ivar("b")), "v");
        assert!(!r.failed);
        assert_eq!(r.result, add(ivar("v"), sub(ivar("a"), ivar("b"))));

        // (v - a) + b -> v + (b - a)
        let r = solve_expression(&add(sub(ivar("v"), ivar("a")), ivar("b")), "v");
        assert!(!r.failed);
        assert_eq!(r.result, add(ivar("v"), sub(ivar("b"), ivar("a"))));

        // (v - a) - b -> v - (a + b)
        let r = solve_expression(&sub(sub(ivar("v"), ivar("a")), ivar("b")), "v");
        assert!(!r.failed);
        assert_eq!(r.result, sub(ivar("v"), add(ivar("a"), ivar("b"))));
    }

    #[test]
    fn test_variable_already_left_is_kept() {
        let e = sub(ivar("v"), ivar("y"));
        let r = solve_expression(&e, "v");
        assert!(!r.failed);
        assert_eq!(r.result, e);
    }

    #[test]
    fn test_failure_leaves_input_unchanged() {
        // v on both sides
        let both = add(ivar("v"), mul(ivar("v"), ivar("y")));
        let r = solve_expression(&both, "v");
        assert!(r.failed);
        assert_eq!(r.result, both);

        // v absent
        let absent = add(ivar("a"), ivar("b"));
        assert!(solve_expression(&absent, "v").failed);

        // v on the right of a non-commutative operator
        let sub_right = sub(ivar("a"), ivar("v"));
        assert!(solve_expression(&sub_right, "v").failed);

        // v under a select
        let sel = select(lt(ivar("v"), ivar("y")), ivar("v"), ivar("y"));
        assert!(solve_expression(&sel, "v").failed);
    }

    #[test]
    fn test_mul_spine() {
        let r = solve_expression(&mul(mul(ivar("a"), ivar("v")), ivar("b")), "v");
        assert!(!r.failed);
        assert_eq!(r.result, mul(ivar("v"), mul(ivar("a"), ivar("b"))));
    }
}
