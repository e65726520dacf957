//! Template error types.

/// Errors produced while parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A placeholder names a key the context does not provide.
    #[error("no context value for placeholder '%({token})s'")]
    MissingContextKey { token: String },

    /// The template text is not well formed.
    #[error("malformed template {input:?} at offset {offset}: {reason}")]
    Malformed {
        input: String,
        offset: usize,
        reason: String,
    },
}

impl TemplateError {
    /// The placeholder name for a missing-key error.
    pub fn missing_token(&self) -> Option<&str> {
        match self {
            TemplateError::MissingContextKey { token } => Some(token),
            TemplateError::Malformed { .. } => None,
        }
    }
}
