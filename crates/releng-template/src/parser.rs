//! Template parser.
//!
//! Splits a configuration string into literal text and `%(name)s`
//! placeholder tokens.

use crate::error::TemplateError;

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied to the output unchanged.
    Literal(String),

    /// A named placeholder, filled from the context at render time.
    Placeholder(String),
}

/// Parse a template string into segments.
///
/// Syntax:
/// - `%(name)s` is a placeholder for `name`
/// - `%%` is a literal `%`
/// - any other `%` is kept as-is
///
/// An opened token without a closing `)`, an empty name, or a conversion
/// other than `s` is rejected.
pub fn parse_template(input: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        match chars.peek() {
            Some(&(_, '%')) => {
                chars.next();
                literal.push('%');
            }
            Some(&(_, '(')) => {
                chars.next();
                let name_start = offset + 2;

                let mut name_end = None;
                for (i, ch) in chars.by_ref() {
                    if ch == ')' {
                        name_end = Some(i);
                        break;
                    }
                }
                let name_end = name_end
                    .ok_or_else(|| malformed(input, offset, "unterminated placeholder"))?;

                let name = &input[name_start..name_end];
                if name.is_empty() {
                    return Err(malformed(input, offset, "empty placeholder name"));
                }

                match chars.next() {
                    Some((_, 's')) => {}
                    Some((_, other)) => {
                        return Err(malformed(
                            input,
                            offset,
                            format!("unsupported conversion '{}'", other),
                        ));
                    }
                    None => {
                        return Err(malformed(input, offset, "missing conversion after ')'"));
                    }
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name.to_string()));
            }
            _ => literal.push('%'),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

fn malformed(input: &str, offset: usize, reason: impl Into<String>) -> TemplateError {
    TemplateError::Malformed {
        input: input.to_string(),
        offset,
        reason: reason.into(),
    }
}
