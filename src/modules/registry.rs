//! Central registry for all playbook modules

use std::collections::HashMap;

use crate::modules::core::{ShellDefaults, ShellModule};
use crate::modules::files::{FileModule, TemplateModule};
use crate::modules::interface::PlayModule;

/// Name to module mapping.
///
/// Built once at start-up and then shared read-only with the task runner.
/// Registration is add-only: registering a name twice is a configuration bug
/// and panics.
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn PlayModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Create a registry with all core modules pre-registered
    pub fn with_core_modules() -> Self {
        Self::with_shell_defaults(ShellDefaults::default())
    }

    /// Core modules, with the shell module using `defaults` for tasks that do
    /// not set their own user, group or timeout
    pub fn with_shell_defaults(defaults: ShellDefaults) -> Self {
        let mut registry = Self::new();

        registry.register("file", Box::new(FileModule::new()));
        registry.register("shell", Box::new(ShellModule::new(defaults)));
        registry.register("template", Box::new(TemplateModule::new()));

        registry
    }

    /// Bind `name` to `module`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn register(&mut self, name: impl Into<String>, module: Box<dyn PlayModule>) {
        let name = name.into();
        if self.modules.contains_key(&name) {
            panic!("config: Register PlayModule twice for {name}");
        }
        tracing::debug!("Registered module '{}'", name);
        self.modules.insert(name, module);
    }

    pub fn dispatch(&self, name: &str) -> Option<&dyn PlayModule> {
        self.modules.get(name).map(|m| m.as_ref())
    }

    pub fn list_modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
