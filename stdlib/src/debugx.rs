//! Extensions to debug introspection: reading and redirecting the scope table
//! (`_ENV` upvalue) a function resolves free names against.
//!
//! Both functions take either a function or a stack level as their first argument.
//! Level 0 is the running `getfenv`/`setfenv` call itself, level 1 its caller, and so
//! on; levels only line up when the native is invoked through `VmContext::call`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use ldk_core::module::{Module, ModuleRegistry};
use ldk_core::val::{ClosureValue, ENV_UPVALUE, Upvalue, Val};
use ldk_core::vm::VmContext;

use crate::args::{arg_error, check_table};

/// What the first argument of `getfenv`/`setfenv` refers to.
enum Target {
    /// Native functions resolve only through the global table and cannot be redirected.
    Native,
    Closure(Arc<ClosureValue>),
    /// A stack level with no active frame.
    Missing,
}

/// Slot index and current cell of the closure's scope binding, if it has one.
/// The first capture named `_ENV` in declaration order wins.
pub fn find_scope_binding(closure: &ClosureValue) -> Option<(usize, Upvalue)> {
    closure
        .enumerate_captures()
        .into_iter()
        .enumerate()
        .find(|(_, (name, _))| name.as_ref() == ENV_UPVALUE)
        .map(|(slot, (_, cell))| (slot, cell))
}

fn resolve_target(args: &[Val], func: &str, ctx: &VmContext) -> Result<Target> {
    let arg = args.first();
    match arg {
        Some(Val::RustFunction(_)) => Ok(Target::Native),
        Some(Val::Closure(closure)) => Ok(Target::Closure(closure.clone())),
        Some(other) => match other.as_integer() {
            Some(level) => Ok(frame_target(ctx, level)),
            None => Err(arg_error(1, func, "Function or level", other.type_name())),
        },
        None => Err(arg_error(1, func, "Function or level", "no value")),
    }
}

fn frame_target(ctx: &VmContext, level: i64) -> Target {
    let Ok(level) = usize::try_from(level) else {
        return Target::Missing;
    };
    match ctx.frame(level).map(|frame| &frame.function) {
        Some(Val::Closure(closure)) => Target::Closure(closure.clone()),
        Some(_) => Target::Native,
        None => {
            tracing::trace!(target: "ldk::debugx", requested = level, depth = ctx.call_stack_depth(), "no frame at level");
            Target::Missing
        }
    }
}

#[derive(Debug)]
pub struct DebugxModule {
    functions: HashMap<String, Val>,
}

impl Default for DebugxModule {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugxModule {
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        functions.insert("getfenv".to_string(), Val::RustFunction(Self::getfenv));
        functions.insert("setfenv".to_string(), Val::RustFunction(Self::setfenv));
        Self { functions }
    }

    /// getfenv(f_or_level) -> Table | nil
    ///
    /// Native functions report the global table. Missing frames and closures without a
    /// scope binding yield nil.
    pub fn getfenv(args: &[Val], ctx: &mut VmContext) -> Result<Val> {
        match resolve_target(args, "getfenv", ctx)? {
            Target::Native => Ok(Val::Table(ctx.globals().clone())),
            Target::Missing => Ok(Val::Nil),
            Target::Closure(closure) => Ok(find_scope_binding(&closure)
                .map(|(_, cell)| cell.get())
                .unwrap_or_default()),
        }
    }

    /// setfenv(f_or_level, scope) -> Bool
    ///
    /// Points the closure's `_ENV` slot at a fresh cell holding `scope`. The old cell is
    /// not written, so other closures sharing it keep their scope.
    pub fn setfenv(args: &[Val], ctx: &mut VmContext) -> Result<Val> {
        let target = resolve_target(args, "setfenv", ctx)?;
        let scope = check_table(args, 2, "setfenv")?;

        let closure = match target {
            Target::Closure(closure) => closure,
            Target::Native | Target::Missing => return Ok(Val::Bool(false)),
        };
        let Some((slot, _)) = find_scope_binding(&closure) else {
            tracing::trace!(target: "ldk::debugx", function = closure.name(), "no scope binding");
            return Ok(Val::Bool(false));
        };

        if !closure.join_upvalue(slot, Upvalue::new(Val::Table(scope))) {
            return Ok(Val::Bool(false));
        }
        tracing::debug!(target: "ldk::debugx", function = closure.name(), slot, "redirected scope binding");
        Ok(Val::Bool(true))
    }
}

impl Module for DebugxModule {
    fn name(&self) -> &str {
        "debugx"
    }

    fn description(&self) -> &str {
        "Per-function scope table introspection and redirection"
    }

    fn register(&self, _registry: &mut ModuleRegistry) -> Result<()> {
        Ok(())
    }

    fn exports(&self) -> HashMap<String, Val> {
        self.functions.clone()
    }
}
