//! Wildcard Term Matching
//!
//! `expr_match` matches a subject expression against a pattern whose
//! variables named `x<digits>` or `y<digits>` are wildcards. A wildcard
//! binds to the subexpression it lines up with, once; a second occurrence
//! must line up with a structurally equal subexpression. All other nodes
//! (including non-wildcard variables) match structurally.

use crate::ir::{Expr, ScalarType};
use std::collections::HashMap;

/// Check whether `name` denotes a wildcard: `x` or `y` followed by digits.
pub fn is_wildcard(name: &str) -> bool {
    let mut chars = name.chars();
    if !matches!(chars.next(), Some('x' | 'y')) {
        return false;
    }
    let rest = &name[1..];
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}

/// Match `subject` against `pattern`. On success returns the wildcard
/// bindings; on failure returns `None`.
pub fn expr_match(pattern: &Expr, subject: &Expr) -> Option<HashMap<String, Expr>> {
    let mut bindings = HashMap::new();
    if match_into(pattern, subject, &mut bindings) {
        Some(bindings)
    } else {
        None
    }
}

/// Match into an existing binding map, so a caller can accumulate bindings
/// across several pattern/subject pairs. On failure the map may hold partial
/// bindings and should be discarded.
pub(crate) fn match_into(
    pattern: &Expr,
    subject: &Expr,
    bindings: &mut HashMap<String, Expr>,
) -> bool {
    if let Expr::Var { name, ty } = pattern {
        if is_wildcard(name) {
            return bind_wildcard(name, *ty, subject, bindings);
        }
    }
    match (pattern, subject) {
        (Expr::IntLit { value: pa, ty: ta }, Expr::IntLit { value: pb, ty: tb }) => {
            pa == pb && ta == tb
        }
        (Expr::UIntLit { value: pa, ty: ta }, Expr::UIntLit { value: pb, ty: tb }) => {
            pa == pb && ta == tb
        }
        (Expr::FloatLit { value: pa, ty: ta }, Expr::FloatLit { value: pb, ty: tb }) => {
            pa.to_bits() == pb.to_bits() && ta == tb
        }
        (Expr::StrLit { value: pa }, Expr::StrLit { value: pb }) => pa == pb,
        (Expr::Var { name: na, ty: ta }, Expr::Var { name: nb, ty: tb }) => na == nb && ta == tb,
        (Expr::Cast { ty: ta, value: pa }, Expr::Cast { ty: tb, value: pb }) => {
            ta == tb && match_into(pa, pb, bindings)
        }
        (
            Expr::Call {
                name: na,
                args: pa,
                value_index: ia,
                kind: ka,
                ty: ta,
            },
            Expr::Call {
                name: nb,
                args: pb,
                value_index: ib,
                kind: kb,
                ty: tb,
            },
        ) => {
            na == nb
                && ia == ib
                && ka == kb
                && ta == tb
                && pa.len() == pb.len()
                && pa.iter().zip(pb).all(|(p, s)| match_into(p, s, bindings))
        }
        (
            Expr::Binary {
                op: oa,
                left: la,
                right: ra,
            },
            Expr::Binary {
                op: ob,
                left: lb,
                right: rb,
            },
        ) => oa == ob && match_into(la, lb, bindings) && match_into(ra, rb, bindings),
        (Expr::Not { value: pa }, Expr::Not { value: pb }) => match_into(pa, pb, bindings),
        (
            Expr::Compare {
                op: oa,
                left: la,
                right: ra,
            },
            Expr::Compare {
                op: ob,
                left: lb,
                right: rb,
            },
        ) => oa == ob && match_into(la, lb, bindings) && match_into(ra, rb, bindings),
        (
            Expr::Select {
                cond: ca,
                if_true: ta,
                if_false: fa,
            },
            Expr::Select {
                cond: cb,
                if_true: tb,
                if_false: fb,
            },
        ) => {
            match_into(ca, cb, bindings)
                && match_into(ta, tb, bindings)
                && match_into(fa, fb, bindings)
        }
        (
            Expr::Let {
                name: na,
                value: pa,
                body: ba,
            },
            Expr::Let {
                name: nb,
                value: pb,
                body: bb,
            },
        ) => na == nb && match_into(pa, pb, bindings) && match_into(ba, bb, bindings),
        _ => false,
    }
}

fn bind_wildcard(
    name: &str,
    ty: ScalarType,
    subject: &Expr,
    bindings: &mut HashMap<String, Expr>,
) -> bool {
    // a wildcard only stands for expressions of its declared type
    if subject.try_scalar_type() != Some(ty) {
        return false;
    }
    match bindings.get(name) {
        Some(bound) => bound == subject,
        None => {
            bindings.insert(name.to_string(), subject.clone());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builders::*;

    #[test]
    fn test_is_wildcard() {
        assert!(is_wildcard("x0"));
        assert!(is_wildcard("y12"));
        assert!(!is_wildcard("x"));
        assert!(!is_wildcard("z0"));
        assert!(!is_wildcard("x0a"));
        assert!(!is_wildcard("rx"));
    }

    #[test]
    fn test_match_binds_wildcards() {
        let pattern = add(ivar("x0"), ivar("y0"));
        let subject = add(ivar("v"), mul(ivar("a"), ivar("b")));
        let bindings = expr_match(&pattern, &subject).expect("should match");
        assert_eq!(bindings["x0"], ivar("v"));
        assert_eq!(bindings["y0"], mul(ivar("a"), ivar("b")));
    }

    #[test]
    fn test_match_rejects_conflicting_rebinding() {
        let pattern = add(ivar("x0"), ivar("x0"));
        assert!(expr_match(&pattern, &add(ivar("v"), ivar("v"))).is_some());
        assert!(expr_match(&pattern, &add(ivar("v"), ivar("w"))).is_none());
    }

    #[test]
    fn test_non_wildcard_vars_match_structurally() {
        let pattern = add(ivar("x0"), ivar("k"));
        assert!(expr_match(&pattern, &add(ivar("v"), ivar("k"))).is_some());
        assert!(expr_match(&pattern, &add(ivar("v"), ivar("j"))).is_none());
    }

    #[test]
    fn test_match_respects_operator_and_shape() {
        let pattern = min(ivar("x0"), ivar("y0"));
        assert!(expr_match(&pattern, &min(ivar("a"), ivar("b"))).is_some());
        assert!(expr_match(&pattern, &max(ivar("a"), ivar("b"))).is_none());
        assert!(expr_match(&pattern, &ivar("a")).is_none());
    }

    #[test]
    fn test_wildcard_type_must_agree() {
        let pattern = add(ivar("x0"), ivar("y0"));
        let narrow = var("v", crate::ir::ScalarType::Int(16));
        let subject = add(narrow.clone(), narrow);
        // i32 wildcards do not bind i16 subexpressions
        assert!(expr_match(&pattern, &subject).is_none());
    }

    #[test]
    fn test_match_through_select() {
        let pattern = select(lt(ivar("x0"), ivar("y0")), ivar("x1"), ivar("y1"));
        let subject = select(
            lt(ivar("v"), ivar("g")),
            ivar("w"),
            ivar("r"),
        );
        let bindings = expr_match(&pattern, &subject).expect("should match");
        assert_eq!(bindings["x1"], ivar("w"));
        assert_eq!(bindings["y1"], ivar("r"));
    }
}
