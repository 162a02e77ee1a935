//! Execution context: global scope, call stack and module loading.

mod context;

pub use context::{CallFrameInfo, VmContext};
