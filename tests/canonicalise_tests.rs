//! Tests for the canonicalisation contracts the prover builds on:
//! simplification, CSE, let expansion and the linear solve, composed the
//! way the prover composes them.

use arraylang::ir::builders::*;
use arraylang::{
    common_subexpression_elimination, simplify, solve_expression, substitute_in_all_lets, Expr,
    Simplifier,
};

#[test]
fn test_literal_operand_normalises_rightward() {
    // 3 + x and x + 3 canonicalise to the same tree
    assert_eq!(
        simplify(&add(int32(3), ivar("x"))),
        simplify(&add(ivar("x"), int32(3)))
    );
}

#[test]
fn test_reassociation_gives_canonical_spines() {
    // a + (b + c) and (a + b) + c canonicalise to the same tree
    assert_eq!(
        simplify(&add(ivar("a"), add(ivar("b"), ivar("c")))),
        simplify(&add(add(ivar("a"), ivar("b")), ivar("c")))
    );
}

#[test]
fn test_simplify_then_cse_then_let_substitution_is_sound() {
    // the prover runs these three passes in exactly this order; the result
    // must end up let-free and semantically unchanged
    let shared = add(mul(ivar("a"), ivar("b")), int32(1));
    let e = mul(shared.clone(), shared);

    let simplified = simplify(&e);
    let cse = common_subexpression_elimination(&simplified);
    assert!(matches!(cse, Expr::Let { .. }));

    let expanded = substitute_in_all_lets(&cse);
    assert_eq!(expanded, simplified);
    assert!(!uses_let(&expanded));
}

#[test]
fn test_solver_isolates_the_variable() {
    // (a + v) + b -> v + (a + b): the variable surfaces on the left of the
    // outermost operator
    let e = add(add(ivar("a"), ivar("v")), ivar("b"));
    let solved = solve_expression(&e, "v");
    assert!(!solved.failed);
    assert_eq!(solved.result, add(ivar("v"), add(ivar("a"), ivar("b"))));
}

#[test]
fn test_solver_failure_is_not_destructive() {
    let e = select(lt(ivar("v"), ivar("y")), ivar("v"), ivar("y"));
    let solved = solve_expression(&e, "v");
    assert!(solved.failed);
    assert_eq!(solved.result, e);
}

#[test]
fn test_full_canonicalisation_of_a_sum_spine() {
    // 1 + v + 2: simplify folds the literals together, solve isolates v
    let e = add(add(int32(1), ivar("v")), int32(2));
    let simplified = simplify(&e);
    assert_eq!(simplified, add(ivar("v"), int32(3)));

    let solved = solve_expression(&simplified, "v");
    assert!(!solved.failed);
    assert_eq!(solved.result, add(ivar("v"), int32(3)));
}

#[test]
fn test_simplifier_iteration_cap_is_respected() {
    // a single pass cannot finish this chain; the capped simplifier must
    // still return a well-formed tree
    let e = add(add(add(int32(1), ivar("x")), int32(2)), int32(3));
    let capped = Simplifier::with_max_iterations(1).simplify(&e);
    let full = simplify(&e);
    assert_eq!(full, add(ivar("x"), int32(6)));
    // both are semantically the sum x + 6 even if the capped form is rougher
    assert_eq!(simplify(&capped), full);
}

fn uses_let(expr: &Expr) -> bool {
    matches!(expr, Expr::Let { .. }) || expr.children().into_iter().any(uses_let)
}
