//! In-place resizing of sequence tables: truncating to a length and padding with the last element.

use std::collections::HashMap;

use anyhow::Result;
use ldk_core::module::{Module, ModuleRegistry};
use ldk_core::val::Val;
use ldk_core::vm::VmContext;

use crate::args::{arg_error, check_integer, check_table};

/// In-place resizing of sequence tables.
#[derive(Debug)]
pub struct ArrayModule {
    functions: HashMap<String, Val>,
}

impl Default for ArrayModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayModule {
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        functions.insert("shrink".to_string(), Val::RustFunction(Self::shrink));
        functions.insert("grow".to_string(), Val::RustFunction(Self::grow));
        Self { functions }
    }

    /// shrink(seq, n): clear trailing elements until the length is `n`.
    /// No-op when `n` is at least the current length; a negative `n` is rejected.
    pub fn shrink(args: &[Val], _ctx: &mut VmContext) -> Result<Val> {
        let seq = check_table(args, 1, "shrink")?;
        let n = check_integer(args, 2, "shrink")?;
        if n < 0 {
            return Err(arg_error(2, "shrink", "non-negative Int", &n.to_string()));
        }

        let before = seq.len();
        let mut len = before;
        while len > n {
            seq.seti(len, Val::Nil);
            len -= 1;
        }
        tracing::trace!(target: "ldk::array", from = before, to = len, "shrink");
        Ok(Val::Nil)
    }

    /// grow(seq, n): append `n` copies of the current last element.
    /// An empty sequence has no last element, so it is left alone.
    pub fn grow(args: &[Val], _ctx: &mut VmContext) -> Result<Val> {
        let seq = check_table(args, 1, "grow")?;
        let n = check_integer(args, 2, "grow")?;

        let before = seq.len();
        if before == 0 || n <= 0 {
            return Ok(Val::Nil);
        }

        let last = seq.geti(before);
        let mut len = before;
        for _ in 0..n {
            len += 1;
            seq.seti(len, last.clone());
        }
        tracing::trace!(target: "ldk::array", from = before, to = len, "grow");
        Ok(Val::Nil)
    }
}

impl Module for ArrayModule {
    fn name(&self) -> &str {
        "array"
    }

    fn description(&self) -> &str {
        "In-place shrink/grow for sequence tables"
    }

    fn register(&self, _registry: &mut ModuleRegistry) -> Result<()> {
        // Functions are only reachable through `require("array")`
        Ok(())
    }

    fn exports(&self) -> HashMap<String, Val> {
        self.functions.clone()
    }
}
