use std::sync::Arc;

use super::{ClosureValue, TableRef, Val};

impl From<String> for Val {
    #[inline]
    fn from(s: String) -> Self {
        Val::Str(Arc::<str>::from(s))
    }
}

impl From<&str> for Val {
    #[inline]
    fn from(s: &str) -> Self {
        Val::Str(Arc::from(s))
    }
}

impl From<i64> for Val {
    #[inline]
    fn from(i: i64) -> Self {
        Val::Int(i)
    }
}

impl From<f64> for Val {
    #[inline]
    fn from(f: f64) -> Self {
        Val::Float(f)
    }
}

impl From<bool> for Val {
    #[inline]
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<TableRef> for Val {
    #[inline]
    fn from(t: TableRef) -> Self {
        Val::Table(t)
    }
}

impl From<Arc<ClosureValue>> for Val {
    #[inline]
    fn from(c: Arc<ClosureValue>) -> Self {
        Val::Closure(c)
    }
}

impl<T> From<Option<T>> for Val
where
    T: Into<Val>,
{
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Val::Nil, Into::into)
    }
}

/// Builds a sequence table holding the values at indices `1..=len`.
impl<T> From<Vec<T>> for Val
where
    T: Into<Val>,
{
    fn from(items: Vec<T>) -> Self {
        Val::Table(TableRef::from_values(items.into_iter().map(Into::into)))
    }
}
