use std::sync::Arc;

use anyhow::Result;

use crate::vm::VmContext;

mod closure;
mod convert;
mod table;

pub use closure::{ClosureValue, ENV_UPVALUE, FunctionProto, ScriptBody, Upvalue};
pub use table::{TableKey, TableRef};

/// Native function signature shared by every builtin and stdlib module.
pub type RustFunction = fn(args: &[Val], ctx: &mut VmContext) -> Result<Val>;

#[derive(Clone, Default)]
pub enum Val {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// String type, wrapped in Arc<str> for efficient cloning
    Str(Arc<str>),
    /// Shared, mutable table; compared by identity
    Table(TableRef),
    /// Script closure with replaceable upvalue slots
    Closure(Arc<ClosureValue>),
    /// Rust function - never owns upvalues, so it never has a scope binding
    RustFunction(RustFunction),
}

impl Val {
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Nil => "Nil",
            Val::Bool(_) => "Bool",
            Val::Int(_) => "Int",
            Val::Float(_) => "Float",
            Val::Str(_) => "String",
            Val::Table(_) => "Table",
            Val::Closure(_) | Val::RustFunction(_) => "Function",
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Val::Nil)
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self, Val::Closure(_) | Val::RustFunction(_))
    }

    #[inline]
    pub fn is_native_function(&self) -> bool {
        matches!(self, Val::RustFunction(_))
    }

    /// Integer view of a number. Floats qualify only when they hold an exact integral value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Val::Int(i) => Some(*i),
            Val::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Val::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<&Arc<ClosureValue>> {
        match self {
            Val::Closure(c) => Some(c),
            _ => None,
        }
    }

    /// Name used for call frames and diagnostics.
    pub fn debug_name(&self) -> Arc<str> {
        match self {
            Val::Closure(closure) => closure.name_arc(),
            Val::RustFunction(_) => Arc::from("<native function>"),
            other => Arc::from(other.type_name()),
        }
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Nil, Val::Nil) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Table(a), Val::Table(b)) => a.ptr_eq(b),
            (Val::Closure(a), Val::Closure(b)) => Arc::ptr_eq(a, b),
            (Val::RustFunction(a), Val::RustFunction(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => false,
        }
    }
}

// Tables and closures can reach themselves through their contents, so Debug never recurses into them.
impl core::fmt::Debug for Val {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Val::Nil => write!(f, "Nil"),
            Val::Bool(b) => write!(f, "Bool({b})"),
            Val::Int(i) => write!(f, "Int({i})"),
            Val::Float(fl) => write!(f, "Float({fl})"),
            Val::Str(s) => write!(f, "Str({:?})", s.as_ref()),
            Val::Table(t) => write!(f, "{t:?}"),
            Val::Closure(c) => write!(f, "{c:?}"),
            Val::RustFunction(_) => write!(f, "RustFunction"),
        }
    }
}

impl core::fmt::Display for Val {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Val::Nil => write!(f, "nil"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Int(i) => write!(f, "{i}"),
            Val::Float(fl) => write!(f, "{fl}"),
            Val::Str(s) => write!(f, "{}", s.as_ref()),
            Val::Table(t) => write!(f, "table: {:#x}", t.addr()),
            Val::Closure(c) => write!(f, "fn {}", c.name()),
            Val::RustFunction(_) => write!(f, "<native function>"),
        }
    }
}
