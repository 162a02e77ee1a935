//! Argument checks shared by native modules. Failures read
//! `bad argument #N to 'fn' (X expected, got Y)`.

use anyhow::{Error, Result, anyhow};
use ldk_core::val::{TableRef, Val};

pub(crate) fn arg_error(pos: usize, func: &str, expected: &str, got: &str) -> Error {
    anyhow!("bad argument #{} to '{}' ({} expected, got {})", pos, func, expected, got)
}

fn type_of(arg: Option<&Val>) -> &'static str {
    arg.map_or("no value", Val::type_name)
}

/// `pos` is 1-based, as in the error message.
pub(crate) fn check_table(args: &[Val], pos: usize, func: &str) -> Result<TableRef> {
    let arg = args.get(pos - 1);
    match arg {
        Some(Val::Table(table)) => Ok(table.clone()),
        _ => Err(arg_error(pos, func, "Table", type_of(arg))),
    }
}

pub(crate) fn check_integer(args: &[Val], pos: usize, func: &str) -> Result<i64> {
    let arg = args.get(pos - 1);
    match arg.and_then(Val::as_integer) {
        Some(n) => Ok(n),
        None => Err(arg_error(pos, func, "Int", type_of(arg))),
    }
}
