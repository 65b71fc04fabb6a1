//! # Common Subexpression Elimination
//!
//! Detects repeated non-leaf subtrees inside one expression and hoists them
//! into `Let` bindings computed once and referenced by name.
//!
//! Algorithm: structural hash every subtree -> bucket by hash with an
//! equality confirm -> hoist duplicates largest-first -> wrap the rewritten
//! body in `Let`s.
//!
//! ```text
//! simplify -> [CSE] -> let substitution -> linear solve
//! ```

use crate::ir::Expr;
use crate::names::unique_name;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Eliminate common subexpressions from `expr`.
///
/// The result is semantically identical; repeated subtrees of two or more
/// nodes are bound once in an enclosing `Let`.
pub fn common_subexpression_elimination(expr: &Expr) -> Expr {
    let mut candidates = duplicated_subtrees(expr);
    // hoist the largest duplicates first so inner copies disappear with them
    candidates.sort_by(|a, b| b.size().cmp(&a.size()));

    let mut body = expr.clone();
    let mut hoisted: Vec<(String, Expr)> = Vec::new();
    for candidate in candidates {
        // an earlier, larger hoist may have removed this duplicate already
        if count_occurrences(&body, &candidate) < 2 {
            continue;
        }
        let Some(ty) = candidate.try_scalar_type() else {
            continue;
        };
        let name = unique_name("t");
        let fresh = Expr::Var {
            name: name.clone(),
            ty,
        };
        body = replace_subtree(&body, &candidate, &fresh);
        hoisted.push((name, candidate));
    }

    // innermost hoist closest to the body
    for (name, value) in hoisted.into_iter().rev() {
        body = Expr::Let {
            name,
            value: Box::new(value),
            body: Box::new(body),
        };
    }
    body
}

/// Non-leaf subtrees occurring at least twice, deduplicated
fn duplicated_subtrees(expr: &Expr) -> Vec<Expr> {
    let mut buckets: HashMap<u64, Vec<(Expr, usize)>> = HashMap::new();
    collect(expr, &mut buckets);

    let mut hashes: Vec<u64> = buckets.keys().copied().collect();
    hashes.sort_unstable();

    let mut out = Vec::new();
    for h in hashes {
        for (subtree, count) in &buckets[&h] {
            if *count >= 2 {
                out.push(subtree.clone());
            }
        }
    }
    out
}

fn collect(expr: &Expr, buckets: &mut HashMap<u64, Vec<(Expr, usize)>>) {
    for child in expr.children() {
        collect(child, buckets);
    }
    // leaves are cheaper to recompute than to bind
    if expr.size() < 2 || matches!(expr, Expr::Let { .. }) {
        return;
    }
    let h = structural_hash(expr);
    let bucket = buckets.entry(h).or_default();
    for (existing, count) in bucket.iter_mut() {
        if *existing == *expr {
            *count += 1;
            return;
        }
    }
    bucket.push((expr.clone(), 1));
}

/// Hash that agrees with structural equality on let-free trees. Float
/// payloads hash by bit pattern.
fn structural_hash(expr: &Expr) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_expr(expr, &mut hasher);
    hasher.finish()
}

fn hash_expr(expr: &Expr, hasher: &mut DefaultHasher) {
    std::mem::discriminant(expr).hash(hasher);
    match expr {
        Expr::IntLit { value, ty } => {
            value.hash(hasher);
            ty.hash(hasher);
        }
        Expr::UIntLit { value, ty } => {
            value.hash(hasher);
            ty.hash(hasher);
        }
        Expr::FloatLit { value, ty } => {
            value.to_bits().hash(hasher);
            ty.hash(hasher);
        }
        Expr::StrLit { value } => value.hash(hasher),
        Expr::Var { name, ty } => {
            name.hash(hasher);
            ty.hash(hasher);
        }
        Expr::Cast { ty, value } => {
            ty.hash(hasher);
            hash_expr(value, hasher);
        }
        Expr::Call {
            name,
            args,
            value_index,
            kind,
            ty,
        } => {
            name.hash(hasher);
            value_index.hash(hasher);
            kind.hash(hasher);
            ty.hash(hasher);
            for arg in args {
                hash_expr(arg, hasher);
            }
        }
        Expr::Binary { op, left, right } => {
            op.hash(hasher);
            hash_expr(left, hasher);
            hash_expr(right, hasher);
        }
        Expr::Not { value } => hash_expr(value, hasher),
        Expr::Compare { op, left, right } => {
            op.hash(hasher);
            hash_expr(left, hasher);
            hash_expr(right, hasher);
        }
        Expr::Select {
            cond,
            if_true,
            if_false,
        } => {
            hash_expr(cond, hasher);
            hash_expr(if_true, hasher);
            hash_expr(if_false, hasher);
        }
        Expr::Let { name, value, body } => {
            name.hash(hasher);
            hash_expr(value, hasher);
            hash_expr(body, hasher);
        }
    }
}

fn count_occurrences(expr: &Expr, target: &Expr) -> usize {
    let here = usize::from(expr == target);
    here + expr
        .children()
        .iter()
        .map(|c| count_occurrences(c, target))
        .sum::<usize>()
}

fn replace_subtree(expr: &Expr, target: &Expr, replacement: &Expr) -> Expr {
    if expr == target {
        return replacement.clone();
    }
    expr.map_children(&mut |c| replace_subtree(c, target, replacement))
}
