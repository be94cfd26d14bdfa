//! Section resolution - expands `@NAME@` placeholders recursively

use std::collections::HashMap;

use tracing::warn;

use super::scanner;
use super::{SectionContent, SectionTable};
use crate::error::TemplateError;
use crate::template::{RenderContext, Template};

/// Result of resolving one piece of content
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Fully substituted text
    pub text: String,
    /// Placeholders that had no section and were replaced by empty text
    pub missing: Vec<String>,
    /// Working copy of the section table, including the recovered entries
    pub sections: SectionTable,
}

/// Resolve `content` against `sections`.
///
/// Every placeholder is replaced by its section, itself resolved first.
/// Unknown placeholders are recovered as empty sections with a warning.
/// The caller's table is never modified; the extended copy is returned in
/// [`Resolved::sections`].
pub fn resolve(
    content: &SectionContent,
    instance: &Template,
    sections: &SectionTable,
    context: &RenderContext,
) -> Result<Resolved, TemplateError> {
    let mut resolver = SectionResolver {
        instance,
        context,
        working: sections.clone(),
        resolved: HashMap::new(),
        resolving: Vec::new(),
        missing: Vec::new(),
    };

    let text = content.materialize(instance, context);
    let text = resolver.expand(text)?;

    Ok(Resolved {
        text,
        missing: resolver.missing,
        sections: resolver.working,
    })
}

struct SectionResolver<'a> {
    instance: &'a Template,
    context: &'a RenderContext,
    working: SectionTable,
    /// Sections already expanded during this resolution
    resolved: HashMap<String, String>,
    /// Sections currently being expanded (cycle detection)
    resolving: Vec<String>,
    missing: Vec<String>,
}

impl SectionResolver<'_> {
    fn expand(&mut self, text: String) -> Result<String, TemplateError> {
        let names = scanner::distinct(&scanner::scan(&text));
        if names.is_empty() {
            return Ok(text);
        }

        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.working.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "missing sections, substituting empty text");
            for name in missing {
                self.working.insert(&name, "");
                if !self.missing.contains(&name) {
                    self.missing.push(name);
                }
            }
        }

        let mut values = HashMap::with_capacity(names.len());
        for name in names {
            let value = self.resolve_section(&name)?;
            values.insert(name, value);
        }

        Ok(scanner::substitute(&text, &values))
    }

    fn resolve_section(&mut self, name: &str) -> Result<String, TemplateError> {
        if let Some(done) = self.resolved.get(name) {
            return Ok(done.clone());
        }

        if let Some(start) = self.resolving.iter().position(|n| n == name) {
            let mut chain = self.resolving[start..].to_vec();
            chain.push(name.to_string());
            return Err(TemplateError::circular(&chain));
        }

        let content = self.working.get(name).cloned().unwrap_or_default();

        self.resolving.push(name.to_string());
        let text = content.materialize(self.instance, self.context);
        let result = self.expand(text);
        self.resolving.pop();

        let text = result?;
        self.resolved.insert(name.to_string(), text.clone());
        Ok(text)
    }
}
