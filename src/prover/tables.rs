//! Associative Pattern Tables
//!
//! Static, once-initialised tables of known-associative operators, keyed by
//! (element type, arity). Entries are written over wildcard variables
//! `x0..`/`y0..` and traversed in the order listed here; more-constrained
//! patterns come first so a composite operator is never shadowed by a basic
//! one. Every entry is checked for associativity and its identity law by the
//! test suite below.

use super::AssociativePattern;
use crate::ir::builders::{add, gt, int32, lt, max, min, mul, select, sub, var};
use crate::ir::{Expr, ScalarType};
use std::sync::OnceLock;

const I32: ScalarType = ScalarType::Int(32);

fn xw(i: usize) -> Expr {
    var(format!("x{i}"), I32)
}

fn yw(i: usize) -> Expr {
    var(format!("y{i}"), I32)
}

/// Table for `(ty, arity)`, or `None` when no table exists for the
/// combination (the proof then fails cleanly).
pub(crate) fn table_for(ty: ScalarType, arity: usize) -> Option<&'static [AssociativePattern]> {
    if ty != I32 {
        return None;
    }
    match arity {
        1 => Some(single_i32()),
        2 => Some(pair_i32()),
        _ => None,
    }
}

fn single_i32() -> &'static [AssociativePattern] {
    static TABLE: OnceLock<Vec<AssociativePattern>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            // x*y + x + y, identity 0
            AssociativePattern::single(
                add(add(mul(xw(0), yw(0)), xw(0)), yw(0)),
                int32(0),
                true,
            ),
            // x + y - x*y, identity 0
            AssociativePattern::single(
                sub(add(xw(0), yw(0)), mul(xw(0), yw(0))),
                int32(0),
                true,
            ),
            AssociativePattern::single(add(xw(0), yw(0)), int32(0), true),
            AssociativePattern::single(mul(xw(0), yw(0)), int32(1), true),
            AssociativePattern::single(
                max(xw(0), yw(0)),
                int32(i64::from(i32::MIN)),
                true,
            ),
            AssociativePattern::single(
                min(xw(0), yw(0)),
                int32(i64::from(i32::MAX)),
                true,
            ),
        ]
    })
}

fn pair_i32() -> &'static [AssociativePattern] {
    static TABLE: OnceLock<Vec<AssociativePattern>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            // complex multiplication; both spellings of the commutative
            // second element, since matching is structural
            AssociativePattern::new(
                vec![
                    sub(mul(xw(0), yw(0)), mul(xw(1), yw(1))),
                    add(mul(xw(1), yw(0)), mul(xw(0), yw(1))),
                ],
                vec![int32(1), int32(0)],
                true,
            ),
            AssociativePattern::new(
                vec![
                    sub(mul(xw(0), yw(0)), mul(xw(1), yw(1))),
                    add(mul(xw(0), yw(1)), mul(xw(1), yw(0))),
                ],
                vec![int32(1), int32(0)],
                true,
            ),
            // argmin / argmax: extremum in element 0, witness in element 1
            AssociativePattern::new(
                vec![
                    min(xw(0), yw(0)),
                    select(lt(xw(0), yw(0)), xw(1), yw(1)),
                ],
                vec![int32(i64::from(i32::MAX)), int32(0)],
                false,
            ),
            AssociativePattern::new(
                vec![
                    max(xw(0), yw(0)),
                    select(gt(xw(0), yw(0)), xw(1), yw(1)),
                ],
                vec![int32(i64::from(i32::MIN)), int32(0)],
                false,
            ),
            // index-swapped variants: witness in element 0, extremum in 1
            AssociativePattern::new(
                vec![
                    select(lt(xw(1), yw(1)), xw(0), yw(0)),
                    min(xw(1), yw(1)),
                ],
                vec![int32(0), int32(i64::from(i32::MAX))],
                false,
            ),
            AssociativePattern::new(
                vec![
                    select(gt(xw(1), yw(1)), xw(0), yw(0)),
                    max(xw(1), yw(1)),
                ],
                vec![int32(0), int32(i64::from(i32::MIN))],
                false,
            ),
        ]
    })
}

// ============================================================================
// Tests: every table entry must satisfy the laws it claims
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, CmpOp};
    use std::collections::HashMap;

    /// Small integer evaluator for pattern operators over wildcard bindings
    fn eval(expr: &Expr, env: &HashMap<String, i64>) -> i64 {
        match expr {
            Expr::IntLit { value, .. } => *value,
            Expr::Var { name, .. } => env[name.as_str()],
            Expr::Binary { op, left, right } => {
                let a = eval(left, env);
                let b = eval(right, env);
                match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Min => a.min(b),
                    BinaryOp::Max => a.max(b),
                    _ => panic!("operator {op:?} not used by table entries"),
                }
            }
            Expr::Compare { op, left, right } => {
                let a = eval(left, env);
                let b = eval(right, env);
                let r = match op {
                    CmpOp::Eq => a == b,
                    CmpOp::Ne => a != b,
                    CmpOp::Lt => a < b,
                    CmpOp::Le => a <= b,
                    CmpOp::Gt => a > b,
                    CmpOp::Ge => a >= b,
                };
                i64::from(r)
            }
            Expr::Select {
                cond,
                if_true,
                if_false,
            } => {
                if eval(cond, env) != 0 {
                    eval(if_true, env)
                } else {
                    eval(if_false, env)
                }
            }
            _ => panic!("unexpected node in a table entry: {expr}"),
        }
    }

    /// Apply an N-element pattern operator to two N-tuples
    fn apply(pattern: &AssociativePattern, a: &[i64], b: &[i64]) -> Vec<i64> {
        let mut env = HashMap::new();
        for (i, v) in a.iter().enumerate() {
            env.insert(format!("x{i}"), *v);
        }
        for (i, v) in b.iter().enumerate() {
            env.insert(format!("y{i}"), *v);
        }
        pattern.ops.iter().map(|op| eval(op, &env)).collect()
    }

    fn sample_tuples(arity: usize) -> Vec<Vec<i64>> {
        let points = [-3i64, -1, 0, 1, 2, 5];
        match arity {
            1 => points.iter().map(|&v| vec![v]).collect(),
            2 => points
                .iter()
                .flat_map(|&a| points.iter().map(move |&b| vec![a, b]))
                .collect(),
            _ => unreachable!(),
        }
    }

    fn check_table(table: &[AssociativePattern], arity: usize) {
        let tuples = sample_tuples(arity);
        for (entry, pattern) in table.iter().enumerate() {
            assert_eq!(pattern.arity(), arity, "entry {entry} has the wrong arity");
            let identity: Vec<i64> = pattern
                .identities
                .iter()
                .map(|e| match e {
                    Expr::IntLit { value, .. } => *value,
                    other => panic!("entry {entry} has a non-literal identity {other}"),
                })
                .collect();

            for a in &tuples {
                // op(a, identity) == a
                assert_eq!(
                    apply(pattern, a, &identity),
                    *a,
                    "entry {entry}: identity law fails at {a:?}"
                );
                for b in &tuples {
                    if pattern.is_commutative {
                        assert_eq!(
                            apply(pattern, a, b),
                            apply(pattern, b, a),
                            "entry {entry}: commutativity fails at {a:?}, {b:?}"
                        );
                    }
                    for c in &tuples {
                        let ab_c = apply(pattern, &apply(pattern, a, b), c);
                        let a_bc = apply(pattern, a, &apply(pattern, b, c));
                        assert_eq!(
                            ab_c, a_bc,
                            "entry {entry}: associativity fails at {a:?}, {b:?}, {c:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_single_element_entries_are_associative() {
        check_table(single_i32(), 1);
    }

    #[test]
    fn test_pair_entries_are_associative() {
        check_table(pair_i32(), 2);
    }

    #[test]
    fn test_unsupported_combinations_have_no_table() {
        assert!(table_for(ScalarType::Float(32), 1).is_none());
        assert!(table_for(I32, 3).is_none());
        assert!(table_for(I32, 1).is_some());
        assert!(table_for(I32, 2).is_some());
    }
}
