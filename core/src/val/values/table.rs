use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};

use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

use super::Val;

/// Hashable table key. Integral floats are normalized to `Int` before they get here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Int(i64),
    Str(Arc<str>),
    Bool(bool),
}

impl TableKey {
    pub fn from_val(key: &Val) -> Result<Self> {
        match key {
            Val::Int(i) => Ok(TableKey::Int(*i)),
            Val::Float(f) if f.is_nan() => Err(anyhow!("table index is NaN")),
            Val::Float(_) => key
                .as_integer()
                .map(TableKey::Int)
                .ok_or_else(|| anyhow!("table index must be an integral number, got {}", key)),
            Val::Str(s) => Ok(TableKey::Str(s.clone())),
            Val::Bool(b) => Ok(TableKey::Bool(*b)),
            Val::Nil => Err(anyhow!("table index is nil")),
            other => Err(anyhow!("unsupported table key type: {}", other.type_name())),
        }
    }

    pub fn to_val(&self) -> Val {
        match self {
            TableKey::Int(i) => Val::Int(*i),
            TableKey::Str(s) => Val::Str(s.clone()),
            TableKey::Bool(b) => Val::Bool(*b),
        }
    }
}

impl From<&str> for TableKey {
    fn from(s: &str) -> Self {
        TableKey::Str(Arc::from(s))
    }
}

impl From<i64> for TableKey {
    fn from(i: i64) -> Self {
        TableKey::Int(i)
    }
}

/// Storage behind a table. `array[i]` holds key `i + 1`; every slot is non-nil, so
/// `array.len()` is always the border. No integer key `1..=array.len()` lives in `hash`.
#[derive(Default)]
struct TableData {
    array: Vec<Val>,
    hash: FastHashMap<TableKey, Val>,
}

impl TableData {
    fn get(&self, key: &TableKey) -> Val {
        if let TableKey::Int(i) = key
            && let Some(slot) = self.array_slot(*i)
        {
            return self.array[slot].clone();
        }
        self.hash.get(key).cloned().unwrap_or_default()
    }

    fn array_slot(&self, index: i64) -> Option<usize> {
        if index >= 1 && (index as u64) <= self.array.len() as u64 {
            Some((index - 1) as usize)
        } else {
            None
        }
    }

    fn set(&mut self, key: TableKey, value: Val) {
        let TableKey::Int(index) = key else {
            self.set_hash(key, value);
            return;
        };

        if let Some(slot) = self.array_slot(index) {
            if !value.is_nil() {
                self.array[slot] = value;
            } else if slot + 1 == self.array.len() {
                self.array.pop();
            } else {
                // Clearing inside the border: the tail is no longer contiguous with 1.
                let tail = self.array.split_off(slot + 1);
                self.array.truncate(slot);
                for (offset, v) in tail.into_iter().enumerate() {
                    self.hash.insert(TableKey::Int(index + 1 + offset as i64), v);
                }
            }
            return;
        }

        if index == self.array.len() as i64 + 1 && !value.is_nil() {
            self.hash.remove(&key);
            self.array.push(value);
            self.migrate_from_hash();
        } else {
            self.set_hash(key, value);
        }
    }

    fn set_hash(&mut self, key: TableKey, value: Val) {
        if value.is_nil() {
            self.hash.remove(&key);
        } else {
            self.hash.insert(key, value);
        }
    }

    // Pull `len+1, len+2, ...` out of the hash part after an append.
    fn migrate_from_hash(&mut self) {
        loop {
            let next = TableKey::Int(self.array.len() as i64 + 1);
            match self.hash.remove(&next) {
                Some(v) => self.array.push(v),
                None => break,
            }
        }
    }
}

/// Shared, interior-mutable table. Clones alias the same storage.
#[derive(Clone)]
pub struct TableRef(Arc<RwLock<TableData>>);

impl Default for TableRef {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRef {
    pub fn new() -> Self {
        TableRef(Arc::new(RwLock::new(TableData {
            array: Vec::new(),
            hash: fast_hash_map_new(),
        })))
    }

    /// Sequence table with `values` at indices `1..`. Nil values end the sequence early;
    /// anything after them lands in the hash part.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Val>,
    {
        let table = Self::new();
        {
            let mut data = table.write();
            for (offset, value) in values.into_iter().enumerate() {
                data.set(TableKey::Int(offset as i64 + 1), value);
            }
        }
        table
    }

    // Readers never observe a half-applied `set`, so a poisoned lock still guards valid data.
    fn read(&self) -> RwLockReadGuard<'_, TableData> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableData> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Border of the sequence part: the count of contiguous present indices from 1.
    pub fn len(&self) -> i64 {
        self.read().array.len() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn geti(&self, index: i64) -> Val {
        self.read().get(&TableKey::Int(index))
    }

    pub fn seti(&self, index: i64, value: Val) {
        self.write().set(TableKey::Int(index), value);
    }

    pub fn get_field(&self, name: &str) -> Val {
        self.read().get(&TableKey::from(name))
    }

    pub fn set_field(&self, name: &str, value: Val) {
        self.write().set(TableKey::from(name), value);
    }

    pub fn get(&self, key: &Val) -> Result<Val> {
        let key = TableKey::from_val(key)?;
        Ok(self.read().get(&key))
    }

    pub fn set(&self, key: &Val, value: Val) -> Result<()> {
        let key = TableKey::from_val(key)?;
        self.write().set(key, value);
        Ok(())
    }

    /// Snapshot of the sequence part.
    pub fn to_vec(&self) -> Vec<Val> {
        self.read().array.clone()
    }

    /// Snapshot of every present entry, sequence part first.
    pub fn entries(&self) -> Vec<(TableKey, Val)> {
        let data = self.read();
        let mut out = Vec::with_capacity(data.array.len() + data.hash.len());
        for (offset, v) in data.array.iter().enumerate() {
            out.push((TableKey::Int(offset as i64 + 1), v.clone()));
        }
        for (k, v) in data.hash.iter() {
            out.push((k.clone(), v.clone()));
        }
        out
    }

    #[inline]
    pub fn ptr_eq(&self, other: &TableRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl core::fmt::Debug for TableRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let data = self.read();
        f.debug_struct("Table")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("len", &data.array.len())
            .field("hash_len", &data.hash.len())
            .finish()
    }
}
