//! Template catalogs - templates and compilers declared in TOML
//!
//! ```toml
//! [[template]]
//! type = "page"
//! name = "basic"
//! default = true
//! layout = "<main>@HEADER@</main>"
//!
//! [template.sections]
//! header = "<h1><%= title %></h1>"
//!
//! [template.options]
//! class = "wide"
//!
//! [[compiler]]
//! name = "greeting"
//! template = "Hello <%= name %>"
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::error::InterpolateError;
use crate::interpolate::{Interpolator, TagInterpolator};
use crate::registry::{RegistryError, TemplateRegistry};
use crate::template::{RenderContext, Template};

/// Errors that can occur when loading or installing catalogs
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse catalog TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("template '{name}' of type '{template_type}' is already declared")]
    Duplicate { template_type: String, name: String },
    #[error("compiler '{name}': {source}")]
    Compiler {
        name: String,
        #[source]
        source: InterpolateError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Templates and compilers read from a catalog file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateSpec>,
    #[serde(default, rename = "compiler")]
    pub compilers: Vec<CompilerSpec>,
}

/// One `[[template]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSpec {
    #[serde(rename = "type")]
    pub template_type: String,
    pub name: String,
    /// Make this the default of its type
    #[serde(default)]
    pub default: bool,
    /// Element id prefix; the type name when absent
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub sections: IndexMap<String, String>,
    #[serde(default)]
    pub options: Map<String, Value>,
}

/// One `[[compiler]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerSpec {
    pub name: String,
    pub template: String,
}

impl Catalog {
    /// Load a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a catalog from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    /// Register every template and compiler of this catalog.
    ///
    /// The whole catalog is validated first; on error the registry is left
    /// unchanged.
    pub fn install(&self, registry: &mut TemplateRegistry) -> Result<(), CatalogError> {
        self.validate(registry)?;

        for spec in &self.templates {
            let shared = Rc::new(spec.clone());
            registry.register(&spec.template_type, &spec.name, move || shared.build());
        }

        for spec in self.templates.iter().filter(|spec| spec.default) {
            registry.set_default_template(&spec.template_type, &spec.name)?;
        }

        for spec in &self.compilers {
            let name = spec.name.clone();
            let text = spec.template.clone();
            registry.compiler(spec.name.clone(), move |data| {
                let mut context = RenderContext::new();
                context.merge_value(data);
                TagInterpolator
                    .interpolate(&text, &context)
                    .unwrap_or_else(|err| {
                        warn!(compiler = %name, error = %err, "compiler failed, rendering empty text");
                        String::new()
                    })
            });
        }
        Ok(())
    }

    /// Check duplicates and compiler syntax without touching `registry`
    fn validate(&self, registry: &TemplateRegistry) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for spec in &self.templates {
            let key = (spec.template_type.as_str(), spec.name.as_str());
            if !seen.insert(key) || registry.has_template(key.0, key.1) {
                return Err(CatalogError::Duplicate {
                    template_type: spec.template_type.clone(),
                    name: spec.name.clone(),
                });
            }
        }

        for spec in &self.compilers {
            TagInterpolator
                .check(&spec.template)
                .map_err(|source| CatalogError::Compiler {
                    name: spec.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

impl TemplateSpec {
    /// Build a fresh template from this entry
    pub fn build(&self) -> Template {
        let mut template = Template::with_prefix(self.prefix.as_deref().unwrap_or(&self.template_type));
        template
            .set_layout(self.layout.as_str())
            .set_sections(&self.sections)
            .merge_options(self.options.clone());
        template
    }
}
