use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};

use crate::vm::VmContext;

use super::Val;

/// Name of the upvalue that holds a closure's scope table.
pub const ENV_UPVALUE: &str = "_ENV";

/// Body of a script function. Free names are read through `VmContext::resolve_free`,
/// which goes through the running closure's `_ENV` upvalue.
pub type ScriptBody = Arc<dyn Fn(&mut VmContext, &[Val]) -> Result<Val> + Send + Sync>;

/// A captured variable cell. Clones share the cell, so a write through one holder is
/// visible through all of them.
#[derive(Clone, Default)]
pub struct Upvalue(Arc<RwLock<Val>>);

impl Upvalue {
    pub fn new(value: Val) -> Self {
        Upvalue(Arc::new(RwLock::new(value)))
    }

    pub fn get(&self) -> Val {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, value: Val) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Upvalue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl core::fmt::Debug for Upvalue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Upvalue({:p})", Arc::as_ptr(&self.0))
    }
}

/// Static part of a function: its name, the names of the variables it captures (in
/// declaration order), and its body.
pub struct FunctionProto {
    name: Arc<str>,
    upvalue_names: Arc<[Arc<str>]>,
    body: ScriptBody,
}

impl FunctionProto {
    pub fn new<F>(name: &str, upvalue_names: &[&str], body: F) -> Arc<Self>
    where
        F: Fn(&mut VmContext, &[Val]) -> Result<Val> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: Arc::from(name),
            upvalue_names: upvalue_names.iter().map(|n| Arc::<str>::from(*n)).collect(),
            body: Arc::new(body),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn upvalue_names(&self) -> &[Arc<str>] {
        &self.upvalue_names
    }
}

impl core::fmt::Debug for FunctionProto {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionProto")
            .field("name", &self.name)
            .field("upvalues", &self.upvalue_names)
            .field("body", &"<body>")
            .finish()
    }
}

/// A script closure. Each upvalue slot points at a shared cell; the slot itself can be
/// redirected to a different cell with [`ClosureValue::join_upvalue`].
pub struct ClosureValue {
    proto: Arc<FunctionProto>,
    upvalues: RwLock<Vec<Upvalue>>,
}

impl ClosureValue {
    pub fn new(proto: Arc<FunctionProto>, upvalues: Vec<Upvalue>) -> Result<Arc<Self>> {
        let closure = Self {
            proto,
            upvalues: RwLock::new(upvalues),
        };
        let cells = closure.slots().len();
        if cells != closure.upvalue_count() {
            return Err(anyhow!(
                "function '{}' declares {} upvalues, got {} cells",
                closure.name(),
                closure.upvalue_count(),
                cells
            ));
        }
        Ok(Arc::new(closure))
    }

    fn slots(&self) -> RwLockReadGuard<'_, Vec<Upvalue>> {
        self.upvalues.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn slots_mut(&self) -> RwLockWriteGuard<'_, Vec<Upvalue>> {
        self.upvalues.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn proto(&self) -> &Arc<FunctionProto> {
        &self.proto
    }

    pub fn name(&self) -> &str {
        &self.proto.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.proto.name.clone()
    }

    pub(crate) fn body(&self) -> ScriptBody {
        self.proto.body.clone()
    }

    pub fn upvalue_count(&self) -> usize {
        self.proto.upvalue_names.len()
    }

    pub fn upvalue_name(&self, idx: usize) -> Option<&str> {
        self.proto.upvalue_names.get(idx).map(|n| n.as_ref())
    }

    /// Every capture in declaration order, paired with a handle to the cell the slot
    /// currently points at.
    pub fn enumerate_captures(&self) -> Vec<(Arc<str>, Upvalue)> {
        let slots = self.slots();
        self.proto
            .upvalue_names
            .iter()
            .cloned()
            .zip(slots.iter().cloned())
            .collect()
    }

    pub fn upvalue(&self, idx: usize) -> Option<Upvalue> {
        self.slots().get(idx).cloned()
    }

    pub fn get_upvalue(&self, idx: usize) -> Option<Val> {
        self.slots().get(idx).map(Upvalue::get)
    }

    /// Writes into the cell, so every closure sharing it sees the new value.
    pub fn set_upvalue(&self, idx: usize, value: Val) -> bool {
        match self.slots().get(idx) {
            Some(cell) => {
                cell.set(value);
                true
            }
            None => false,
        }
    }

    /// Points slot `idx` at `cell`. The previous cell is left untouched for its other holders.
    pub fn join_upvalue(&self, idx: usize, cell: Upvalue) -> bool {
        match self.slots_mut().get_mut(idx) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub fn shares_upvalue(&self, idx: usize, other: &ClosureValue, other_idx: usize) -> bool {
        let Some(mine) = self.upvalue(idx) else {
            return false;
        };
        other.upvalue(other_idx).is_some_and(|theirs| mine.ptr_eq(&theirs))
    }
}

impl core::fmt::Debug for ClosureValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClosureValue")
            .field("name", &self.proto.name)
            .field("upvalues", &self.proto.upvalue_names)
            .finish()
    }
}
