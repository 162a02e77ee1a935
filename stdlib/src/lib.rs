mod args;
pub mod array;
pub mod debugx;


use anyhow::Result;
use ldk_core::module::ModuleRegistry;

/// Register all stdlib modules with the given registry
pub fn register_stdlib_modules(registry: &mut ModuleRegistry) -> Result<()> {
    registry.register_module("array", Box::new(array::ArrayModule::new()))?;
    registry.register_module("debugx", Box::new(debugx::DebugxModule::new()))?;
    Ok(())
}

#[unsafe(no_mangle)]
pub extern "Rust" fn ldk_stdlib_register_modules(registry: &mut ModuleRegistry) -> Result<()> {
    register_stdlib_modules(registry)
}
