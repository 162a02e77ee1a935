use crate::val::Val;
use anyhow::{Result, anyhow};
use std::collections::HashMap;

/// Central module registry inspired by Lua's linit.c
///
/// Holds every native module that `VmContext::require` can load, plus builtins that
/// are installed straight into a context's global table.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn Module>>,
    builtin_functions: HashMap<String, Val>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module with the registry
    pub fn register_module(&mut self, name: &str, module: Box<dyn Module>) -> Result<()> {
        if self.modules.contains_key(name) {
            return Err(anyhow!("Module '{}' is already registered", name));
        }
        if module.enabled() {
            module.register(self)?;
        }

        self.modules.insert(name.to_string(), module);
        Ok(())
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Result<&dyn Module> {
        self.modules
            .get(name)
            .map(|boxed| boxed.as_ref())
            .ok_or_else(|| anyhow!("Module '{}' not found", name))
    }

    /// Get all registered module names, sorted
    pub fn get_module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register a builtin function globally
    pub fn register_builtin(&mut self, name: &str, func: Val) {
        self.builtin_functions.insert(name.to_string(), func);
    }

    pub fn get_builtin(&self, name: &str) -> Option<&Val> {
        self.builtin_functions.get(name)
    }

    pub fn builtin_iter(&self) -> impl Iterator<Item = (&String, &Val)> {
        self.builtin_functions.iter()
    }
}

/// Module trait inspired by Lua's library pattern
///
/// A module's exports become the namespace table handed out by `require`.
pub trait Module: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn description(&self) -> &str {
        ""
    }

    fn enabled(&self) -> bool {
        true
    }

    /// Hook for modules that also publish builtins into the registry
    fn register(&self, registry: &mut ModuleRegistry) -> Result<()>;

    /// Get all exports from this module
    fn exports(&self) -> HashMap<String, Val>;

    fn metadata(&self) -> HashMap<String, String> {
        let mut meta = HashMap::new();
        meta.insert("name".to_string(), self.name().to_string());
        meta.insert("version".to_string(), self.version().to_string());
        meta.insert("description".to_string(), self.description().to_string());
        meta.insert("enabled".to_string(), self.enabled().to_string());
        meta
    }
}
