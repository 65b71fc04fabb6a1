//! Expression Constructors
//!
//! Free helper functions for building expression trees, particularly useful
//! for tests and callers assembling update definitions by hand.
//!
//! ## Example
//!
//! ```rust
//! use arraylang::ir::builders::*;
//!
//! // y + z + f(r)   (a sum reduction over the self-call f(r))
//! let update = add(
//!     add(ivar("y"), ivar("z")),
//!     self_call("f", vec![ivar("r")], 0, arraylang::ScalarType::Int(32)),
//! );
//! assert_eq!(update.to_string(), "((y + z) + f(r))");
//! ```

use super::{BinaryOp, CallKind, CmpOp, Expr, ScalarType};

/// 32-bit signed integer literal
pub fn int32(value: i64) -> Expr {
    Expr::IntLit {
        value,
        ty: ScalarType::Int(32),
    }
}

/// Signed integer literal of an explicit type
pub fn int_of(value: i64, ty: ScalarType) -> Expr {
    Expr::IntLit { value, ty }
}

/// Unsigned integer literal of an explicit type
pub fn uint_of(value: u64, ty: ScalarType) -> Expr {
    Expr::UIntLit { value, ty }
}

/// 32-bit float literal
pub fn f32_lit(value: f64) -> Expr {
    Expr::FloatLit {
        value,
        ty: ScalarType::Float(32),
    }
}

/// Boolean literal
pub fn bool_lit(value: bool) -> Expr {
    Expr::UIntLit {
        value: u64::from(value),
        ty: ScalarType::BOOL,
    }
}

/// String literal
pub fn str_lit(value: impl Into<String>) -> Expr {
    Expr::StrLit {
        value: value.into(),
    }
}

/// Typed variable reference
pub fn var(name: impl Into<String>, ty: ScalarType) -> Expr {
    Expr::Var {
        name: name.into(),
        ty,
    }
}

/// 32-bit signed integer variable (the common case in tests)
pub fn ivar(name: impl Into<String>) -> Expr {
    var(name, ScalarType::Int(32))
}

/// Type conversion
pub fn cast(ty: ScalarType, value: Expr) -> Expr {
    Expr::Cast {
        ty,
        value: Box::new(value),
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn add(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Add, left, right)
}

pub fn sub(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Sub, left, right)
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Mul, left, right)
}

pub fn div(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Div, left, right)
}

pub fn modulo(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Mod, left, right)
}

pub fn min(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Min, left, right)
}

pub fn max(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Max, left, right)
}

pub fn and(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::And, left, right)
}

pub fn or(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Or, left, right)
}

pub fn not(value: Expr) -> Expr {
    Expr::Not {
        value: Box::new(value),
    }
}

fn compare(op: CmpOp, left: Expr, right: Expr) -> Expr {
    Expr::Compare {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    compare(CmpOp::Eq, left, right)
}

pub fn ne(left: Expr, right: Expr) -> Expr {
    compare(CmpOp::Ne, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    compare(CmpOp::Lt, left, right)
}

pub fn le(left: Expr, right: Expr) -> Expr {
    compare(CmpOp::Le, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    compare(CmpOp::Gt, left, right)
}

pub fn ge(left: Expr, right: Expr) -> Expr {
    compare(CmpOp::Ge, left, right)
}

/// Value-level conditional
pub fn select(cond: Expr, if_true: Expr, if_false: Expr) -> Expr {
    Expr::Select {
        cond: Box::new(cond),
        if_true: Box::new(if_true),
        if_false: Box::new(if_false),
    }
}

/// Local binding
pub fn let_in(name: impl Into<String>, value: Expr, body: Expr) -> Expr {
    Expr::Let {
        name: name.into(),
        value: Box::new(value),
        body: Box::new(body),
    }
}

/// Call to the function being defined (a self-call site)
pub fn self_call(name: impl Into<String>, args: Vec<Expr>, value_index: usize, ty: ScalarType) -> Expr {
    Expr::Call {
        name: name.into(),
        args,
        value_index,
        kind: CallKind::Internal,
        ty,
    }
}

/// Call to some other pure function
pub fn extern_call(name: impl Into<String>, args: Vec<Expr>, value_index: usize, ty: ScalarType) -> Expr {
    Expr::Call {
        name: name.into(),
        args,
        value_index,
        kind: CallKind::External,
        ty,
    }
}
