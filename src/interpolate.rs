//! Tag interpolation - fills `<%= path %>` tags from a render context
//!
//! Two tags are understood:
//!
//! - `<%= path %>` inserts the value as is
//! - `<%- path %>` inserts the value HTML-escaped
//!
//! `path` is a dotted lookup (`user.name`, `items.0`). A root name missing from
//! the context is an error; a missing field below an existing root renders as
//! empty text. Evaluation blocks (`<% ... %>`) are rejected.

use serde_json::Value;

use crate::error::{InterpolateError, Span};
use crate::template::RenderContext;

/// Turns resolved template text into final output
pub trait Interpolator {
    fn interpolate(&self, text: &str, context: &RenderContext) -> Result<String, InterpolateError>;
}

/// The default `<%= %>` / `<%- %>` interpolator
#[derive(Debug, Clone, Copy, Default)]
pub struct TagInterpolator;

impl TagInterpolator {
    /// Check tag syntax without evaluating anything
    pub fn check(&self, text: &str) -> Result<(), InterpolateError> {
        parse(text).map(|_| ())
    }
}

impl Interpolator for TagInterpolator {
    fn interpolate(&self, text: &str, context: &RenderContext) -> Result<String, InterpolateError> {
        let mut out = String::with_capacity(text.len());
        for segment in parse(text)? {
            match segment {
                Segment::Text(raw) => out.push_str(raw),
                Segment::Raw { path, span } => out.push_str(&display(lookup(context, path, span)?)),
                Segment::Escaped { path, span } => {
                    out.push_str(&escape_html(&display(lookup(context, path, span)?)))
                }
            }
        }
        Ok(out)
    }
}

/// Interpolate with [`TagInterpolator`]
pub fn interpolate(text: &str, context: &RenderContext) -> Result<String, InterpolateError> {
    TagInterpolator.interpolate(text, context)
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Text(&'a str),
    Raw { path: &'a str, span: Span },
    Escaped { path: &'a str, span: Span },
}

fn parse(text: &str) -> Result<Vec<Segment<'_>>, InterpolateError> {
    let mut segments = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find("<%") {
        let open = pos + offset;
        if open > pos {
            segments.push(Segment::Text(&text[pos..open]));
        }

        let body_start = open + 2;
        let close = match text[body_start..].find("%>") {
            Some(offset) => body_start + offset,
            None => {
                return Err(InterpolateError::Unterminated {
                    span: open..text.len(),
                })
            }
        };
        let span = open..close + 2;
        let body = &text[body_start..close];

        let (escaped, expr) = match body.chars().next() {
            Some('=') => (false, &body[1..]),
            Some('-') => (true, &body[1..]),
            _ => {
                return Err(InterpolateError::UnsupportedTag {
                    tag: text[span.clone()].to_string(),
                    span,
                })
            }
        };

        let path = expr.trim();
        if path.is_empty() {
            return Err(InterpolateError::EmptyExpression { span });
        }

        segments.push(if escaped {
            Segment::Escaped { path, span }
        } else {
            Segment::Raw { path, span }
        });
        pos = close + 2;
    }

    if pos < text.len() {
        segments.push(Segment::Text(&text[pos..]));
    }
    Ok(segments)
}

static NULL: Value = Value::Null;

fn lookup<'c>(
    context: &'c RenderContext,
    path: &str,
    span: Span,
) -> Result<&'c Value, InterpolateError> {
    let root = path.split('.').next().unwrap_or(path);
    if context.get(root).is_none() {
        return Err(InterpolateError::UndefinedVariable {
            name: root.to_string(),
            span,
        });
    }
    Ok(context.get_path(path).unwrap_or(&NULL))
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
