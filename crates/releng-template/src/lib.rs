//! Validated `%(name)s` placeholder substitution.
//!
//! Configuration values carry printf-style named placeholders such as
//! `%(abs_obj_dir)s`. This crate parses them explicitly and renders them
//! against a [`Context`], failing on any name the context does not provide
//! instead of producing a half-substituted string.

mod context;
mod error;
mod parser;

pub use context::Context;
pub use error::TemplateError;
pub use parser::{parse_template, Segment};

use std::str::FromStr;

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string.
    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            source: input.to_string(),
            segments: parse_template(input)?,
        })
    }

    /// The original, unrendered text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of appearance (repeats included).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// True when the template contains no placeholders.
    pub fn is_literal(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Render against a context.
    ///
    /// Substituted values are inserted verbatim and never re-parsed.
    pub fn render(&self, context: &Context) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = context.get(name).ok_or_else(|| {
                        TemplateError::MissingContextKey {
                            token: name.clone(),
                        }
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse and render in one step.
pub fn render(input: &str, context: &Context) -> Result<String, TemplateError> {
    Template::parse(input)?.render(context)
}

/// Parse and list placeholder names in one step.
pub fn placeholders(input: &str) -> Result<Vec<String>, TemplateError> {
    Ok(Template::parse(input)?
        .placeholders()
        .map(str::to_string)
        .collect())
}
