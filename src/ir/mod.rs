//! # Expression IR
//!
//! Immutable expression trees for reduction update bodies.
//! Used across the canonicalisation passes (simplify, CSE, substitution,
//! linear solve) and the associativity prover for consistency.
//!
//! ## Builders
//!
//! For programmatic construction of expressions, see the [`builders`] module
//! which provides helpers like `add`, `min`, `select` and `self_call`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub mod builders;

// ============================================================================
// Scalar Types
// ============================================================================

/// Scalar element type: signed/unsigned integer or IEEE float of a fixed
/// bit width. `UInt(1)` is the boolean type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Signed integer with the given bit width (8/16/32/64)
    Int(u8),
    /// Unsigned integer with the given bit width (1/8/16/32/64)
    UInt(u8),
    /// IEEE float with the given bit width (16/32/64)
    Float(u8),
}

impl ScalarType {
    /// The boolean type
    pub const BOOL: ScalarType = ScalarType::UInt(1);

    /// Bit width of the type
    pub fn bits(&self) -> u8 {
        match self {
            ScalarType::Int(b) | ScalarType::UInt(b) | ScalarType::Float(b) => *b,
        }
    }

    /// Check if this is a signed integer type
    pub fn is_int(&self) -> bool {
        matches!(self, ScalarType::Int(_))
    }

    /// Check if this is an unsigned integer type
    pub fn is_uint(&self) -> bool {
        matches!(self, ScalarType::UInt(_))
    }

    /// Check if this is a float type
    pub fn is_float(&self) -> bool {
        matches!(self, ScalarType::Float(_))
    }

    /// Check if this is the boolean type
    pub fn is_bool(&self) -> bool {
        matches!(self, ScalarType::UInt(1))
    }

    /// Smallest representable value, as a literal expression
    pub fn min_expr(&self) -> Expr {
        match self {
            ScalarType::Int(64) => Expr::IntLit { value: i64::MIN, ty: *self },
            ScalarType::Int(b) => Expr::IntLit {
                value: -(1i64 << (b - 1)),
                ty: *self,
            },
            ScalarType::UInt(_) => Expr::UIntLit { value: 0, ty: *self },
            ScalarType::Float(16) => Expr::FloatLit { value: -65504.0, ty: *self },
            ScalarType::Float(32) => Expr::FloatLit {
                value: f64::from(f32::MIN),
                ty: *self,
            },
            ScalarType::Float(_) => Expr::FloatLit { value: f64::MIN, ty: *self },
        }
    }

    /// Largest representable value, as a literal expression
    pub fn max_expr(&self) -> Expr {
        match self {
            ScalarType::Int(64) => Expr::IntLit { value: i64::MAX, ty: *self },
            ScalarType::Int(b) => Expr::IntLit {
                value: (1i64 << (b - 1)) - 1,
                ty: *self,
            },
            ScalarType::UInt(64) => Expr::UIntLit { value: u64::MAX, ty: *self },
            ScalarType::UInt(b) => Expr::UIntLit {
                value: (1u64 << b) - 1,
                ty: *self,
            },
            ScalarType::Float(16) => Expr::FloatLit { value: 65504.0, ty: *self },
            ScalarType::Float(32) => Expr::FloatLit {
                value: f64::from(f32::MAX),
                ty: *self,
            },
            ScalarType::Float(_) => Expr::FloatLit { value: f64::MAX, ty: *self },
        }
    }

    /// Zero of this type (also boolean `false`)
    pub fn zero_expr(&self) -> Expr {
        match self {
            ScalarType::Int(_) => Expr::IntLit { value: 0, ty: *self },
            ScalarType::UInt(_) => Expr::UIntLit { value: 0, ty: *self },
            ScalarType::Float(_) => Expr::FloatLit { value: 0.0, ty: *self },
        }
    }

    /// One of this type (also boolean `true`)
    pub fn one_expr(&self) -> Expr {
        match self {
            ScalarType::Int(_) => Expr::IntLit { value: 1, ty: *self },
            ScalarType::UInt(_) => Expr::UIntLit { value: 1, ty: *self },
            ScalarType::Float(_) => Expr::FloatLit { value: 1.0, ty: *self },
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::UInt(1) => write!(f, "bool"),
            ScalarType::Int(b) => write!(f, "i{b}"),
            ScalarType::UInt(b) => write!(f, "u{b}"),
            ScalarType::Float(b) => write!(f, "f{b}"),
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Binary operator: arithmetic, extrema and boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    And,
    Or,
}

impl BinaryOp {
    /// Whether `a op b == b op a` for all operands
    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::Min | BinaryOp::Max | BinaryOp::And | BinaryOp::Or
        )
    }

    /// Whether `(a op b) op c == a op (b op c)` for all operands
    pub fn is_associative(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::Min | BinaryOp::Max | BinaryOp::And | BinaryOp::Or
        )
    }
}

/// Comparison operator (always boolean-valued)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// The comparison equivalent to `!(a op b)`
    pub fn negated(&self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }
}

/// How a call site resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    /// A call to a function defined in the same pipeline; self-calls in a
    /// reduction update are always `Internal`
    Internal,
    /// A call to some other pure function
    External,
}

// ============================================================================
// Expressions
// ============================================================================

/// An immutable expression tree.
///
/// All rewrites construct fresh nodes; nothing mutates in place. Sharing is
/// by cloning the (structural) value.
///
/// Equality is structural modulo alpha-renaming of `Let`-bound names, which
/// is why `PartialEq` is implemented by hand below. `Hash` is not
/// implemented because float literals carry `f64` payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Signed integer literal
    IntLit { value: i64, ty: ScalarType },
    /// Unsigned integer literal; booleans are `UIntLit` of type `UInt(1)`
    UIntLit { value: u64, ty: ScalarType },
    /// Floating point literal
    FloatLit { value: f64, ty: ScalarType },
    /// String literal; opaque, participates only in structural equality
    StrLit { value: String },
    /// Typed variable reference
    Var { name: String, ty: ScalarType },
    /// Type conversion
    Cast { ty: ScalarType, value: Box<Expr> },
    /// Function call. `value_index` selects the tuple element for
    /// tuple-valued functions.
    Call {
        name: String,
        args: Vec<Expr>,
        value_index: usize,
        kind: CallKind,
        ty: ScalarType,
    },
    /// Binary operator application
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Boolean negation
    Not { value: Box<Expr> },
    /// Comparison
    Compare {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `cond ? if_true : if_false` as a value
    Select {
        cond: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    /// Local binding
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
}

impl Expr {
    /// The scalar type of this node, if it has one. String literals do not.
    pub fn try_scalar_type(&self) -> Option<ScalarType> {
        match self {
            Expr::IntLit { ty, .. }
            | Expr::UIntLit { ty, .. }
            | Expr::FloatLit { ty, .. }
            | Expr::Var { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::Call { ty, .. } => Some(*ty),
            Expr::StrLit { .. } => None,
            Expr::Binary { op, left, .. } => match op {
                BinaryOp::And | BinaryOp::Or => Some(ScalarType::BOOL),
                _ => left.try_scalar_type(),
            },
            Expr::Not { .. } | Expr::Compare { .. } => Some(ScalarType::BOOL),
            Expr::Select { if_true, .. } => if_true.try_scalar_type(),
            Expr::Let { body, .. } => body.try_scalar_type(),
        }
    }

    /// The scalar type of this node. Panics on string literals, which have
    /// none; those never appear in positions where a type is demanded.
    pub fn scalar_type(&self) -> ScalarType {
        self.try_scalar_type()
            .expect("string literals carry no scalar type")
    }

    /// Check if this node is a literal
    pub fn is_const(&self) -> bool {
        matches!(
            self,
            Expr::IntLit { .. } | Expr::UIntLit { .. } | Expr::FloatLit { .. } | Expr::StrLit { .. }
        )
    }

    /// View this node as a variable reference
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Immediate children, in evaluation order
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::IntLit { .. }
            | Expr::UIntLit { .. }
            | Expr::FloatLit { .. }
            | Expr::StrLit { .. }
            | Expr::Var { .. } => vec![],
            Expr::Cast { value, .. } => vec![value],
            Expr::Call { args, .. } => args.iter().collect(),
            Expr::Binary { left, right, .. } | Expr::Compare { left, right, .. } => {
                vec![left, right]
            }
            Expr::Not { value } => vec![value],
            Expr::Select {
                cond,
                if_true,
                if_false,
            } => vec![cond, if_true, if_false],
            Expr::Let { value, body, .. } => vec![value, body],
        }
    }

    /// Rebuild this node with every child mapped through `f`. Leaves are
    /// returned as clones. `Let` scoping is not interpreted here; passes
    /// that care about shadowing match `Let` before delegating.
    pub fn map_children(&self, f: &mut impl FnMut(&Expr) -> Expr) -> Expr {
        match self {
            Expr::IntLit { .. }
            | Expr::UIntLit { .. }
            | Expr::FloatLit { .. }
            | Expr::StrLit { .. }
            | Expr::Var { .. } => self.clone(),
            Expr::Cast { ty, value } => Expr::Cast {
                ty: *ty,
                value: Box::new(f(value)),
            },
            Expr::Call {
                name,
                args,
                value_index,
                kind,
                ty,
            } => Expr::Call {
                name: name.clone(),
                args: args.iter().map(&mut *f).collect(),
                value_index: *value_index,
                kind: *kind,
                ty: *ty,
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(f(left)),
                right: Box::new(f(right)),
            },
            Expr::Not { value } => Expr::Not {
                value: Box::new(f(value)),
            },
            Expr::Compare { op, left, right } => Expr::Compare {
                op: *op,
                left: Box::new(f(left)),
                right: Box::new(f(right)),
            },
            Expr::Select {
                cond,
                if_true,
                if_false,
            } => Expr::Select {
                cond: Box::new(f(cond)),
                if_true: Box::new(f(if_true)),
                if_false: Box::new(f(if_false)),
            },
            Expr::Let { name, value, body } => Expr::Let {
                name: name.clone(),
                value: Box::new(f(value)),
                body: Box::new(f(body)),
            },
        }
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }
}

// ============================================================================
// Structural Equality (alpha-renaming aware)
// ============================================================================

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        eq_inner(self, other, &mut Vec::new())
    }
}

fn eq_inner(a: &Expr, b: &Expr, env: &mut Vec<(String, String)>) -> bool {
    match (a, b) {
        (Expr::IntLit { value: va, ty: ta }, Expr::IntLit { value: vb, ty: tb }) => {
            va == vb && ta == tb
        }
        (Expr::UIntLit { value: va, ty: ta }, Expr::UIntLit { value: vb, ty: tb }) => {
            va == vb && ta == tb
        }
        (Expr::FloatLit { value: va, ty: ta }, Expr::FloatLit { value: vb, ty: tb }) => {
            // bit equality: NaN payloads and signed zeros are distinct
            va.to_bits() == vb.to_bits() && ta == tb
        }
        (Expr::StrLit { value: va }, Expr::StrLit { value: vb }) => va == vb,
        (Expr::Var { name: na, ty: ta }, Expr::Var { name: nb, ty: tb }) => {
            if ta != tb {
                return false;
            }
            // resolve through the alpha environment, innermost binding first
            for (ba, bb) in env.iter().rev() {
                if ba == na || bb == nb {
                    return ba == na && bb == nb;
                }
            }
            na == nb
        }
        (Expr::Cast { ty: ta, value: va }, Expr::Cast { ty: tb, value: vb }) => {
            ta == tb && eq_inner(va, vb, env)
        }
        (
            Expr::Call {
                name: na,
                args: aa,
                value_index: ia,
                kind: ka,
                ty: ta,
            },
            Expr::Call {
                name: nb,
                args: ab,
                value_index: ib,
                kind: kb,
                ty: tb,
            },
        ) => {
            na == nb
                && ia == ib
                && ka == kb
                && ta == tb
                && aa.len() == ab.len()
                && aa.iter().zip(ab).all(|(x, y)| eq_inner(x, y, env))
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
        ) => oa == ob && eq_inner(la, lb, env) && eq_inner(ra, rb, env),
        (Expr::Not { value: va }, Expr::Not { value: vb }) => eq_inner(va, vb, env),
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
        ) => oa == ob && eq_inner(la, lb, env) && eq_inner(ra, rb, env),
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
        ) => eq_inner(ca, cb, env) && eq_inner(ta, tb, env) && eq_inner(fa, fb, env),
        (
            Expr::Let {
                name: na,
                value: va,
                body: ba,
            },
            Expr::Let {
                name: nb,
                value: vb,
                body: bb,
            },
        ) => {
            if !eq_inner(va, vb, env) {
                return false;
            }
            env.push((na.clone(), nb.clone()));
            let result = eq_inner(ba, bb, env);
            env.pop();
            result
        }
        _ => false,
    }
}

/// Structural equality, modulo alpha-renaming of `Let`-bound names
pub fn equal(a: &Expr, b: &Expr) -> bool {
    a == b
}

// ============================================================================
// Variable Scans
// ============================================================================

/// Check whether `expr` references the free variable `name`
pub fn expr_uses_var(expr: &Expr, name: &str) -> bool {
    uses(expr, &|n| n == name, &mut Vec::new())
}

/// Check whether `expr` references any free variable in `names`
pub fn expr_uses_vars(expr: &Expr, names: &HashSet<String>) -> bool {
    uses(expr, &|n| names.contains(n), &mut Vec::new())
}

fn uses(expr: &Expr, pred: &dyn Fn(&str) -> bool, shadowed: &mut Vec<String>) -> bool {
    match expr {
        Expr::Var { name, .. } => !shadowed.iter().any(|s| s == name) && pred(name),
        Expr::Let { name, value, body } => {
            if uses(value, pred, shadowed) {
                return true;
            }
            shadowed.push(name.clone());
            let result = uses(body, pred, shadowed);
            shadowed.pop();
            result
        }
        _ => expr.children().into_iter().any(|c| uses(c, pred, shadowed)),
    }
}

/// All free variable names of `expr`
pub fn free_vars(expr: &Expr) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_free(expr, &mut Vec::new(), &mut out);
    out
}

fn collect_free(expr: &Expr, shadowed: &mut Vec<String>, out: &mut HashSet<String>) {
    match expr {
        Expr::Var { name, .. } => {
            if !shadowed.iter().any(|s| s == name) {
                out.insert(name.clone());
            }
        }
        Expr::Let { name, value, body } => {
            collect_free(value, shadowed, out);
            shadowed.push(name.clone());
            collect_free(body, shadowed, out);
            shadowed.pop();
        }
        _ => {
            for c in expr.children() {
                collect_free(c, shadowed, out);
            }
        }
    }
}

// ============================================================================
// Pretty Printing
// ============================================================================

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntLit { value, .. } => write!(f, "{value}"),
            Expr::UIntLit { value, ty } => {
                if ty.is_bool() {
                    write!(f, "{}", *value != 0)
                } else {
                    write!(f, "{value}u")
                }
            }
            Expr::FloatLit { value, .. } => write!(f, "{value}f"),
            Expr::StrLit { value } => write!(f, "{value:?}"),
            Expr::Var { name, .. } => write!(f, "{name}"),
            Expr::Cast { ty, value } => write!(f, "{ty}({value})"),
            Expr::Call {
                name,
                args,
                value_index,
                ..
            } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")?;
                if *value_index > 0 {
                    write!(f, "[{value_index}]")?;
                }
                Ok(())
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::Min => write!(f, "min({left}, {right})"),
                BinaryOp::Max => write!(f, "max({left}, {right})"),
                _ => {
                    let sym = match op {
                        BinaryOp::Add => "+",
                        BinaryOp::Sub => "-",
                        BinaryOp::Mul => "*",
                        BinaryOp::Div => "/",
                        BinaryOp::Mod => "%",
                        BinaryOp::And => "&&",
                        BinaryOp::Or => "||",
                        BinaryOp::Min | BinaryOp::Max => unreachable!(),
                    };
                    write!(f, "({left} {sym} {right})")
                }
            },
            Expr::Not { value } => write!(f, "!({value})"),
            Expr::Compare { op, left, right } => {
                let sym = match op {
                    CmpOp::Eq => "==",
                    CmpOp::Ne => "!=",
                    CmpOp::Lt => "<",
                    CmpOp::Le => "<=",
                    CmpOp::Gt => ">",
                    CmpOp::Ge => ">=",
                };
                write!(f, "({left} {sym} {right})")
            }
            Expr::Select {
                cond,
                if_true,
                if_false,
            } => write!(f, "select({cond}, {if_true}, {if_false})"),
            Expr::Let { name, value, body } => write!(f, "(let {name} = {value} in {body})"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
