//! Error types for section resolution and interpolation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in template text
pub type Span = std::ops::Range<usize>;

/// Errors raised while expanding section placeholders
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    /// A section refers back to itself, directly or through other sections
    #[error("circular section reference detected: {chain}")]
    CircularSection { chain: String },
}

impl TemplateError {
    /// Create a circular section error from the names on the resolution stack
    pub fn circular(chain: &[String]) -> Self {
        Self::CircularSection {
            chain: chain.join(" -> "),
        }
    }
}

/// Errors raised by the tag interpolator
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpolateError {
    /// A `<%` opener without its closing `%>`
    #[error("unterminated tag at {span:?}")]
    Unterminated { span: Span },

    /// A tag kind the interpolator does not evaluate
    #[error("unsupported tag '{tag}' at {span:?}")]
    UnsupportedTag { tag: String, span: Span },

    /// A tag with nothing to look up
    #[error("empty expression at {span:?}")]
    EmptyExpression { span: Span },

    /// The root of a lookup path is not in the render context
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },
}

impl InterpolateError {
    /// Location of the offending tag in the interpolated text
    pub fn span(&self) -> &Span {
        match self {
            InterpolateError::Unterminated { span }
            | InterpolateError::UnsupportedTag { span, .. }
            | InterpolateError::EmptyExpression { span }
            | InterpolateError::UndefinedVariable { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.span().clone();
        let message = self.to_string();
        let mut buf = Vec::new();

        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(label_for(self))
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        if written.is_err() {
            return message;
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn label_for(err: &InterpolateError) -> String {
    match err {
        InterpolateError::Unterminated { .. } => "tag opened here is never closed with '%>'".to_string(),
        InterpolateError::UnsupportedTag { .. } => {
            "only '<%= path %>' and '<%- path %>' are supported".to_string()
        }
        InterpolateError::EmptyExpression { .. } => "expected a variable path".to_string(),
        InterpolateError::UndefinedVariable { name, .. } => {
            format!("'{}' is not in the render context", name)
        }
    }
}
