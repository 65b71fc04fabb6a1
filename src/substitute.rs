//! Substitution and Let Expansion
//!
//! `substitute` and `substitute_map` replace free variable references by
//! expressions; `Let` bindings shadow as expected. `substitute_map` performs
//! all replacements in a single simultaneous pass, which callers rely on
//! when one replacement's expression mentions another's name.
//! `substitute_in_all_lets` removes every `Let` by inlining its value.

use crate::ir::Expr;
use std::collections::HashMap;

/// Replace every free occurrence of `name` in `expr` by `value`.
pub fn substitute(name: &str, value: &Expr, expr: &Expr) -> Expr {
    let mut bindings = HashMap::new();
    bindings.insert(name.to_string(), value.clone());
    substitute_map(&bindings, expr)
}

/// Replace every free occurrence of each key in `bindings` simultaneously.
pub fn substitute_map(bindings: &HashMap<String, Expr>, expr: &Expr) -> Expr {
    subst(expr, bindings, &mut Vec::new())
}

fn subst(expr: &Expr, bindings: &HashMap<String, Expr>, shadowed: &mut Vec<String>) -> Expr {
    match expr {
        Expr::Var { name, .. } => {
            if shadowed.iter().any(|s| s == name) {
                return expr.clone();
            }
            match bindings.get(name) {
                Some(replacement) => replacement.clone(),
                None => expr.clone(),
            }
        }
        Expr::Let { name, value, body } => {
            let value = subst(value, bindings, shadowed);
            shadowed.push(name.clone());
            let body = subst(body, bindings, shadowed);
            shadowed.pop();
            Expr::Let {
                name: name.clone(),
                value: Box::new(value),
                body: Box::new(body),
            }
        }
        _ => expr.map_children(&mut |c| subst(c, bindings, shadowed)),
    }
}

/// Inline every `Let` binding so the result is let-free.
pub fn substitute_in_all_lets(expr: &Expr) -> Expr {
    match expr {
        Expr::Let { name, value, body } => {
            let value = substitute_in_all_lets(value);
            let body = substitute_in_all_lets(body);
            substitute(name, &value, &body)
        }
        _ => expr.map_children(&mut |c| substitute_in_all_lets(c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builders::*;

    #[test]
    fn test_substitute_simple() {
        let e = add(ivar("x"), ivar("y"));
        let result = substitute("x", &int32(5), &e);
        assert_eq!(result, add(int32(5), ivar("y")));
    }

    #[test]
    fn test_substitute_respects_shadowing() {
        // substitute x in (let x = x + 1 in x * 2): only the bound value's
        // occurrence is free
        let e = let_in("x", add(ivar("x"), int32(1)), mul(ivar("x"), int32(2)));
        let result = substitute("x", &int32(7), &e);
        assert_eq!(
            result,
            let_in("x", add(int32(7), int32(1)), mul(ivar("x"), int32(2)))
        );
    }

    #[test]
    fn test_substitute_map_is_simultaneous() {
        // a -> b, b -> a must swap, not chain
        let mut bindings = HashMap::new();
        bindings.insert("a".to_string(), ivar("b"));
        bindings.insert("b".to_string(), ivar("a"));
        let e = add(ivar("a"), ivar("b"));
        assert_eq!(substitute_map(&bindings, &e), add(ivar("b"), ivar("a")));
    }

    #[test]
    fn test_substitute_in_all_lets() {
        let e = let_in("t", add(ivar("a"), ivar("b")), mul(ivar("t"), ivar("t")));
        let result = substitute_in_all_lets(&e);
        assert_eq!(
            result,
            mul(add(ivar("a"), ivar("b")), add(ivar("a"), ivar("b")))
        );
    }

    #[test]
    fn test_substitute_in_nested_lets() {
        let e = let_in(
            "t",
            int32(1),
            let_in("u", add(ivar("t"), int32(2)), mul(ivar("t"), ivar("u"))),
        );
        let result = substitute_in_all_lets(&e);
        assert_eq!(result, mul(int32(1), add(int32(1), int32(2))));
    }
}
