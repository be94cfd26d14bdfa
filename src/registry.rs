//! Template registry - named template constructors grouped by type
//!
//! Each type keeps its constructors in registration order and one default
//! name. A separate table holds standalone render functions ("compilers")
//! that are not tied to any type.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::template::Template;

/// Builds a fresh template instance
pub type Constructor = Rc<dyn Fn() -> Template>;

/// Standalone render function
pub type Compiler = Rc<dyn Fn(&Value) -> String>;

/// Errors that can occur during registry operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// Default set to a name that is not registered for the type
    #[error("cannot make '{name}' the default of type '{template_type}': no such template")]
    InvalidDefault { template_type: String, name: String },

    /// Instance requested for an unknown type or name
    #[error("template '{name}' of type '{template_type}' does not exist")]
    UnknownTemplate { template_type: String, name: String },
}

#[derive(Clone, Default)]
struct TemplateType {
    default: Option<String>,
    constructors: IndexMap<String, Constructor>,
}

/// Registry of template constructors and compilers.
///
/// Starts empty. Share one registry by reference between the call sites that
/// register and instantiate templates.
#[derive(Default)]
pub struct TemplateRegistry {
    compilers: IndexMap<String, Compiler>,
    types: IndexMap<String, TemplateType>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // Compilers

    pub fn has_compiler(&self, name: &str) -> bool {
        self.compilers.contains_key(name)
    }

    /// Add a compiler, replacing any with the same name
    pub fn compiler<F>(&mut self, name: impl Into<String>, compiler: F)
    where
        F: Fn(&Value) -> String + 'static,
    {
        self.compilers.insert(name.into(), Rc::new(compiler));
    }

    /// Compiler names in registration order
    pub fn compilers(&self) -> Vec<String> {
        self.compilers.keys().cloned().collect()
    }

    /// Run a compiler; `None` if no compiler has that name.
    ///
    /// Missing data is passed as an empty object.
    pub fn render(&self, name: &str, data: Option<&Value>) -> Option<String> {
        let compiler = self.compilers.get(name)?;
        let empty = Value::Object(Default::default());
        Some(compiler(data.unwrap_or(&empty)))
    }

    // Typed templates

    /// Register a constructor under `template_type`.
    ///
    /// The first name registered for a type becomes its default. Returns false
    /// if the name is already taken; the existing constructor is kept.
    pub fn register<F>(&mut self, template_type: &str, name: &str, constructor: F) -> bool
    where
        F: Fn() -> Template + 'static,
    {
        let entry = self.types.entry(template_type.to_string()).or_default();
        if entry.constructors.contains_key(name) {
            return false;
        }

        entry.constructors.insert(name.to_string(), Rc::new(constructor));
        if entry.default.is_none() {
            entry.default = Some(name.to_string());
        }
        debug!(template_type, name, "registered template");
        true
    }

    /// Registered type names
    pub fn types(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    /// Each type with its template names
    pub fn types_detail(&self) -> IndexMap<String, Vec<String>> {
        self.types
            .iter()
            .map(|(name, entry)| (name.clone(), entry.constructors.keys().cloned().collect()))
            .collect()
    }

    pub fn has_type(&self, template_type: &str) -> bool {
        self.types.contains_key(template_type)
    }

    pub fn has_template(&self, template_type: &str, name: &str) -> bool {
        self.types
            .get(template_type)
            .is_some_and(|entry| entry.constructors.contains_key(name))
    }

    /// Copy of the constructors of a type
    pub fn templates(&self, template_type: &str) -> IndexMap<String, Constructor> {
        self.types
            .get(template_type)
            .map(|entry| entry.constructors.clone())
            .unwrap_or_default()
    }

    /// Template names of a type
    pub fn template_names(&self, template_type: &str) -> Vec<String> {
        self.types
            .get(template_type)
            .map(|entry| entry.constructors.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Default template name of a type.
    ///
    /// Falls back to (and remembers) the first registered name when no valid
    /// default is set. `None` if the type has no templates.
    pub fn default_template(&mut self, template_type: &str) -> Option<String> {
        let entry = self.types.get_mut(template_type)?;

        if let Some(current) = &entry.default {
            if entry.constructors.contains_key(current) {
                return Some(current.clone());
            }
        }

        let first = entry.constructors.keys().next()?.clone();
        entry.default = Some(first.clone());
        Some(first)
    }

    /// Make `name` the default of `template_type`
    pub fn set_default_template(
        &mut self,
        template_type: &str,
        name: &str,
    ) -> Result<(), RegistryError> {
        let entry = self
            .types
            .get_mut(template_type)
            .filter(|entry| entry.constructors.contains_key(name))
            .ok_or_else(|| RegistryError::InvalidDefault {
                template_type: template_type.to_string(),
                name: name.to_string(),
            })?;

        entry.default = Some(name.to_string());
        debug!(template_type, name, "changed default template");
        Ok(())
    }

    /// Build a template of `template_type`, by name or from the type's default
    pub fn template_instance(
        &mut self,
        template_type: &str,
        name: Option<&str>,
    ) -> Result<Template, RegistryError> {
        let name = match name {
            Some(name) => Some(name.to_string()),
            None => self.default_template(template_type),
        };

        let constructor = name
            .as_deref()
            .and_then(|name| self.types.get(template_type)?.constructors.get(name))
            .ok_or_else(|| RegistryError::UnknownTemplate {
                template_type: template_type.to_string(),
                name: name.clone().unwrap_or_default(),
            })?;

        Ok(constructor())
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("compilers", &self.compilers())
            .field("types", &self.types_detail())
            .finish()
    }
}
