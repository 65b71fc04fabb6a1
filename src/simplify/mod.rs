//! # Simplifier
//!
//! Algebraic simplification of expression trees, applied to fixpoint:
//!
//! - Constant folding over all operators (wrapping integer semantics)
//! - Identity elimination: `x + 0`, `x * 1`, `x * 0`, `x - 0`, `x / 1`,
//!   boolean absorption, `min/max(x, x)`, extreme-literal `min`/`max`
//! - Literal commuted rightward for commutative operators: `3 + x` -> `x + 3`
//! - Left-leaning reassociation of associative operators:
//!   `a + (b + c)` -> `(a + b) + c`
//! - Literal collapse along a spine: `(x + 2) + 3` -> `x + 5`
//! - `select` on a literal condition, double negation, comparison negation
//!
//! ```text
//! Expr -> [Simplifier] -> canonical Expr -> CSE -> let substitution -> solve
//! ```

use crate::ir::{BinaryOp, CmpOp, Expr, ScalarType};

/// Simplifier with fixpoint iteration
pub struct Simplifier {
    /// Maximum number of simplification passes
    max_iterations: usize,
}

impl Simplifier {
    /// Create a simplifier with the default iteration cap
    pub fn new() -> Self {
        Simplifier { max_iterations: 10 }
    }

    /// Create a simplifier with a custom iteration cap
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Simplifier { max_iterations }
    }

    /// Simplify an expression to fixpoint
    ///
    /// Applies the rule set repeatedly until the tree stops changing or
    /// `max_iterations` is reached.
    pub fn simplify(&self, expr: &Expr) -> Expr {
        let mut current = expr.clone();
        for _ in 0..self.max_iterations {
            let next = simplify_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Simplify with default settings
pub fn simplify(expr: &Expr) -> Expr {
    Simplifier::new().simplify(expr)
}

/// One bottom-up pass: children first, then the local rules at each node
fn simplify_once(expr: &Expr) -> Expr {
    let expr = expr.map_children(&mut simplify_once);
    apply_node(expr)
}

fn apply_node(expr: Expr) -> Expr {
    match expr {
        Expr::Binary { op, left, right } => simplify_binary(op, *left, *right),
        Expr::Not { value } => simplify_not(*value),
        Expr::Compare { op, left, right } => simplify_compare(op, *left, *right),
        Expr::Select {
            cond,
            if_true,
            if_false,
        } => simplify_select(*cond, *if_true, *if_false),
        Expr::Cast { ty, value } => simplify_cast(ty, *value),
        other => other,
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn simplify_binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    if let Some(folded) = fold_binary(op, &left, &right) {
        return folded;
    }

    let ty = left.try_scalar_type();
    match op {
        BinaryOp::Add => {
            if is_zero(&right) {
                return left;
            }
            if is_zero(&left) {
                return right;
            }
        }
        BinaryOp::Sub => {
            if is_zero(&right) {
                return left;
            }
        }
        BinaryOp::Mul => {
            if is_one(&right) {
                return left;
            }
            if is_one(&left) {
                return right;
            }
            // zero absorption only for exact (integer) arithmetic
            if let Some(ty) = ty {
                if !ty.is_float() && (is_zero(&left) || is_zero(&right)) {
                    return ty.zero_expr();
                }
            }
        }
        BinaryOp::Div => {
            if is_one(&right) {
                return left;
            }
        }
        BinaryOp::Mod => {
            if let Some(ty) = ty {
                if !ty.is_float() && is_one(&right) {
                    return ty.zero_expr();
                }
            }
        }
        BinaryOp::Min => {
            if left == right {
                return left;
            }
            if let Some(ty) = ty {
                if right == ty.max_expr() {
                    return left;
                }
                if left == ty.max_expr() {
                    return right;
                }
            }
        }
        BinaryOp::Max => {
            if left == right {
                return left;
            }
            if let Some(ty) = ty {
                if right == ty.min_expr() {
                    return left;
                }
                if left == ty.min_expr() {
                    return right;
                }
            }
        }
        BinaryOp::And => {
            if left == right {
                return left;
            }
            if is_true(&right) {
                return left;
            }
            if is_true(&left) {
                return right;
            }
            if is_false(&left) || is_false(&right) {
                return ScalarType::BOOL.zero_expr();
            }
        }
        BinaryOp::Or => {
            if left == right {
                return left;
            }
            if is_false(&right) {
                return left;
            }
            if is_false(&left) {
                return right;
            }
            if is_true(&left) || is_true(&right) {
                return ScalarType::BOOL.one_expr();
            }
        }
    }

    // literal operand of a commutative operator goes to the right
    if op.is_commutative() && left.is_const() && !right.is_const() {
        return binary(op, right, left);
    }

    // collapse literals along a left-leaning spine: (x op a) op b -> x op (a op b)
    if op.is_associative() && right.is_const() {
        if let Expr::Binary {
            op: inner,
            left: ll,
            right: lr,
        } = &left
        {
            if *inner == op && lr.is_const() {
                if let Some(folded) = fold_binary(op, lr, &right) {
                    return binary(op, (**ll).clone(), folded);
                }
            }
        }
    }

    // an interior literal drifts to the end of the spine:
    // (a op lit) op b -> (a op b) op lit
    if op.is_commutative() && op.is_associative() && !right.is_const() {
        if let Expr::Binary {
            op: inner,
            left: ll,
            right: lr,
        } = &left
        {
            if *inner == op && lr.is_const() {
                return binary(
                    op,
                    binary(op, (**ll).clone(), right),
                    (**lr).clone(),
                );
            }
        }
    }

    // left-leaning reassociation: a op (b op c) -> (a op b) op c
    if op.is_associative() {
        if let Expr::Binary {
            op: inner,
            left: rl,
            right: rr,
        } = &right
        {
            if *inner == op {
                return binary(op, binary(op, left, (**rl).clone()), (**rr).clone());
            }
        }
    }

    binary(op, left, right)
}

fn simplify_not(value: Expr) -> Expr {
    match value {
        Expr::UIntLit { value, ty } if ty.is_bool() => Expr::UIntLit {
            value: u64::from(value == 0),
            ty,
        },
        Expr::Not { value } => *value,
        Expr::Compare { op, left, right }
            if !left.try_scalar_type().is_some_and(|t| t.is_float()) =>
        {
            Expr::Compare {
                op: op.negated(),
                left,
                right,
            }
        }
        other => Expr::Not {
            value: Box::new(other),
        },
    }
}

fn simplify_compare(op: CmpOp, left: Expr, right: Expr) -> Expr {
    if let Some(result) = fold_compare(op, &left, &right) {
        return Expr::UIntLit {
            value: u64::from(result),
            ty: ScalarType::BOOL,
        };
    }
    // x op x is decidable for exact types
    if left == right && !left.try_scalar_type().is_some_and(|t| t.is_float()) {
        let result = matches!(op, CmpOp::Eq | CmpOp::Le | CmpOp::Ge);
        return Expr::UIntLit {
            value: u64::from(result),
            ty: ScalarType::BOOL,
        };
    }
    Expr::Compare {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn simplify_select(cond: Expr, if_true: Expr, if_false: Expr) -> Expr {
    if is_true(&cond) {
        return if_true;
    }
    if is_false(&cond) {
        return if_false;
    }
    if if_true == if_false {
        return if_true;
    }
    Expr::Select {
        cond: Box::new(cond),
        if_true: Box::new(if_true),
        if_false: Box::new(if_false),
    }
}

fn simplify_cast(ty: ScalarType, value: Expr) -> Expr {
    if value.try_scalar_type() == Some(ty) {
        return value;
    }
    match &value {
        Expr::IntLit { value: v, .. } => match ty {
            ScalarType::Int(_) => Expr::IntLit {
                value: truncate_int(*v, ty),
                ty,
            },
            ScalarType::UInt(_) => Expr::UIntLit {
                value: truncate_uint(*v as u64, ty),
                ty,
            },
            ScalarType::Float(_) => Expr::FloatLit {
                value: *v as f64,
                ty,
            },
        },
        Expr::UIntLit { value: v, .. } => match ty {
            ScalarType::Int(_) => Expr::IntLit {
                value: truncate_int(*v as i64, ty),
                ty,
            },
            ScalarType::UInt(_) => Expr::UIntLit {
                value: truncate_uint(*v, ty),
                ty,
            },
            ScalarType::Float(_) => Expr::FloatLit {
                value: *v as f64,
                ty,
            },
        },
        Expr::FloatLit { value: v, .. } if ty.is_float() => Expr::FloatLit { value: *v, ty },
        _ => Expr::Cast {
            ty,
            value: Box::new(value),
        },
    }
}

// ============================================================================
// Constant Folding
// ============================================================================

fn fold_binary(op: BinaryOp, left: &Expr, right: &Expr) -> Option<Expr> {
    match (left, right) {
        (Expr::IntLit { value: a, ty }, Expr::IntLit { value: b, .. }) => {
            fold_int(op, *a, *b).map(|v| Expr::IntLit {
                value: truncate_int(v, *ty),
                ty: *ty,
            })
        }
        (Expr::UIntLit { value: a, ty }, Expr::UIntLit { value: b, .. }) => {
            fold_uint(op, *a, *b).map(|v| Expr::UIntLit {
                value: truncate_uint(v, *ty),
                ty: *ty,
            })
        }
        (Expr::FloatLit { value: a, ty }, Expr::FloatLit { value: b, .. }) => {
            fold_float(op, *a, *b).map(|v| Expr::FloatLit { value: v, ty: *ty })
        }
        _ => None,
    }
}

fn fold_int(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    Some(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return None;
            }
            a.wrapping_div(b)
        }
        BinaryOp::Mod => {
            if b == 0 {
                return None;
            }
            a.wrapping_rem(b)
        }
        BinaryOp::Min => a.min(b),
        BinaryOp::Max => a.max(b),
        BinaryOp::And | BinaryOp::Or => return None,
    })
}

fn fold_uint(op: BinaryOp, a: u64, b: u64) -> Option<u64> {
    Some(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return None;
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0 {
                return None;
            }
            a % b
        }
        BinaryOp::Min => a.min(b),
        BinaryOp::Max => a.max(b),
        BinaryOp::And => u64::from(a != 0 && b != 0),
        BinaryOp::Or => u64::from(a != 0 || b != 0),
    })
}

fn fold_float(op: BinaryOp, a: f64, b: f64) -> Option<f64> {
    Some(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Min => a.min(b),
        BinaryOp::Max => a.max(b),
        BinaryOp::And | BinaryOp::Or => return None,
    })
}

fn fold_compare(op: CmpOp, left: &Expr, right: &Expr) -> Option<bool> {
    match (left, right) {
        (Expr::IntLit { value: a, .. }, Expr::IntLit { value: b, .. }) => {
            Some(compare_ord(op, a.cmp(b)))
        }
        (Expr::UIntLit { value: a, .. }, Expr::UIntLit { value: b, .. }) => {
            Some(compare_ord(op, a.cmp(b)))
        }
        (Expr::FloatLit { value: a, .. }, Expr::FloatLit { value: b, .. }) => Some(match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }),
        _ => None,
    }
}

fn compare_ord(op: CmpOp, ord: std::cmp::Ordering) -> bool {
    match op {
        CmpOp::Eq => ord.is_eq(),
        CmpOp::Ne => ord.is_ne(),
        CmpOp::Lt => ord.is_lt(),
        CmpOp::Le => ord.is_le(),
        CmpOp::Gt => ord.is_gt(),
        CmpOp::Ge => ord.is_ge(),
    }
}

/// Wrap a folded value into the signed range of `ty`
fn truncate_int(v: i64, ty: ScalarType) -> i64 {
    let bits = ty.bits();
    if bits >= 64 {
        return v;
    }
    let modulus = 1i128 << bits;
    let r = (i128::from(v)).rem_euclid(modulus);
    if r >= modulus / 2 {
        (r - modulus) as i64
    } else {
        r as i64
    }
}

/// Mask a folded value into the unsigned range of `ty`
fn truncate_uint(v: u64, ty: ScalarType) -> u64 {
    let bits = ty.bits();
    if bits >= 64 {
        v
    } else {
        v & ((1u64 << bits) - 1)
    }
}

fn is_zero(e: &Expr) -> bool {
    matches!(e, Expr::IntLit { value: 0, .. } | Expr::UIntLit { value: 0, .. })
        || matches!(e, Expr::FloatLit { value, .. } if *value == 0.0)
}

fn is_one(e: &Expr) -> bool {
    matches!(e, Expr::IntLit { value: 1, .. } | Expr::UIntLit { value: 1, .. })
        || matches!(e, Expr::FloatLit { value, .. } if *value == 1.0)
}

fn is_true(e: &Expr) -> bool {
    matches!(e, Expr::UIntLit { value, ty } if ty.is_bool() && *value != 0)
}

fn is_false(e: &Expr) -> bool {
    matches!(e, Expr::UIntLit { value: 0, ty } if ty.is_bool())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builders::*;

    #[test]
    fn test_constant_folding() {
        assert_eq!(simplify(&add(int32(2), int32(3))), int32(5));
        assert_eq!(simplify(&mul(int32(4), int32(5))), int32(20));
        assert_eq!(simplify(&min(int32(4), int32(5))), int32(4));
        assert_eq!(simplify(&max(int32(4), int32(5))), int32(5));
        assert_eq!(simplify(&sub(int32(1), int32(3))), int32(-2));
    }

    #[test]
    fn test_division_by_zero_is_left_alone() {
        let e = div(ivar("x"), int32(0));
        assert_eq!(simplify(&e), e);
        let lit = div(int32(4), int32(0));
        assert_eq!(simplify(&lit), lit);
    }

    #[test]
    fn test_additive_identity() {
        assert_eq!(simplify(&add(ivar("x"), int32(0))), ivar("x"));
        assert_eq!(simplify(&add(int32(0), ivar("x"))), ivar("x"));
        assert_eq!(simplify(&sub(ivar("x"), int32(0))), ivar("x"));
    }

    #[test]
    fn test_multiplicative_identity_and_absorption() {
        assert_eq!(simplify(&mul(ivar("x"), int32(1))), ivar("x"));
        assert_eq!(simplify(&mul(int32(1), ivar("x"))), ivar("x"));
        assert_eq!(simplify(&mul(ivar("x"), int32(0))), int32(0));
        assert_eq!(simplify(&div(ivar("x"), int32(1))), ivar("x"));
    }

    #[test]
    fn test_literal_commutes_rightward() {
        assert_eq!(simplify(&add(int32(3), ivar("x"))), add(ivar("x"), int32(3)));
        assert_eq!(simplify(&mul(int32(3), ivar("x"))), mul(ivar("x"), int32(3)));
        assert_eq!(
            simplify(&min(int32(3), ivar("x"))),
            min(ivar("x"), int32(3))
        );
    }

    #[test]
    fn test_left_leaning_reassociation() {
        assert_eq!(
            simplify(&add(ivar("a"), add(ivar("b"), ivar("c")))),
            add(add(ivar("a"), ivar("b")), ivar("c"))
        );
    }

    #[test]
    fn test_spine_literal_collapse() {
        // x + 2 + 3 -> x + 5
        assert_eq!(
            simplify(&add(add(ivar("x"), int32(2)), int32(3))),
            add(ivar("x"), int32(5))
        );
        // x + (3 + y) -> (x + y) + 3
        assert_eq!(
            simplify(&add(ivar("x"), add(int32(3), ivar("y")))),
            add(add(ivar("x"), ivar("y")), int32(3))
        );
    }

    #[test]
    fn test_min_max_rules() {
        assert_eq!(simplify(&min(ivar("x"), ivar("x"))), ivar("x"));
        assert_eq!(
            simplify(&min(ivar("x"), ScalarType::Int(32).max_expr())),
            ivar("x")
        );
        assert_eq!(
            simplify(&max(ivar("x"), ScalarType::Int(32).min_expr())),
            ivar("x")
        );
    }

    #[test]
    fn test_boolean_rules() {
        assert_eq!(simplify(&and(ivar_b("p"), bool_lit(true))), ivar_b("p"));
        assert_eq!(simplify(&and(ivar_b("p"), bool_lit(false))), bool_lit(false));
        assert_eq!(simplify(&or(ivar_b("p"), bool_lit(false))), ivar_b("p"));
        assert_eq!(simplify(&or(ivar_b("p"), bool_lit(true))), bool_lit(true));
        assert_eq!(simplify(&not(not(ivar_b("p")))), ivar_b("p"));
    }

    #[test]
    fn test_comparison_rules() {
        assert_eq!(simplify(&lt(int32(1), int32(2))), bool_lit(true));
        assert_eq!(simplify(&ge(int32(1), int32(2))), bool_lit(false));
        assert_eq!(simplify(&le(ivar("x"), ivar("x"))), bool_lit(true));
        assert_eq!(simplify(&ne(ivar("x"), ivar("x"))), bool_lit(false));
        assert_eq!(
            simplify(&not(lt(ivar("x"), ivar("y")))),
            ge(ivar("x"), ivar("y"))
        );
    }

    #[test]
    fn test_select_rules() {
        assert_eq!(
            simplify(&select(bool_lit(true), ivar("a"), ivar("b"))),
            ivar("a")
        );
        assert_eq!(
            simplify(&select(bool_lit(false), ivar("a"), ivar("b"))),
            ivar("b")
        );
        assert_eq!(
            simplify(&select(ivar_b("p"), ivar("a"), ivar("a"))),
            ivar("a")
        );
    }

    #[test]
    fn test_cast_rules() {
        assert_eq!(
            simplify(&cast(ScalarType::Int(32), ivar("x"))),
            ivar("x")
        );
        assert_eq!(
            simplify(&cast(ScalarType::Int(16), int32(70000))),
            int_of(4464, ScalarType::Int(16))
        );
        let opaque = cast(ScalarType::Int(16), ivar("x"));
        assert_eq!(
            simplify(&min(var("w", ScalarType::Int(16)), opaque.clone())),
            min(var("w", ScalarType::Int(16)), opaque)
        );
    }

    #[test]
    fn test_width_truncation_wraps() {
        // 200 + 100 wraps in i8
        let e = add(
            int_of(200, ScalarType::Int(8)),
            int_of(100, ScalarType::Int(8)),
        );
        assert_eq!(simplify(&e), int_of(44, ScalarType::Int(8)));
    }

    #[test]
    fn test_fixpoint_terminates_on_mixed_chain() {
        // 1 + x + 2 + y + 3 -> ((x + y) + 6)
        let e = add(add(add(add(int32(1), ivar("x")), int32(2)), ivar("y")), int32(3));
        assert_eq!(
            simplify(&e),
            add(add(ivar("x"), ivar("y")), int32(6))
        );
    }

    fn ivar_b(name: &str) -> Expr {
        var(name, ScalarType::BOOL)
    }
}
