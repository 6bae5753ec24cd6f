//! Template variable substitution
//!
//! Query fields may contain placeholders (dashboard variables, time-range
//! expressions). The host supplies a [`TemplateResolver`]; the crate ships
//! [`VariableInterpolator`] as a self-contained implementation.

pub mod interpolate;
pub mod scope;

pub use interpolate::VariableInterpolator;
pub use scope::{ScopedVar, ScopedVars, TimeRange};

/// Error raised while substituting a template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// Placeholder names a variable the scope does not bind
    #[error("unknown template variable: {0}")]
    UnknownVariable(String),

    /// Placeholder requests a format the variable does not support
    #[error("unsupported format '{format}' for variable {name}")]
    UnsupportedFormat {
        /// Variable name
        name: String,
        /// Requested format
        format: String,
    },

    /// `${` without a closing brace
    #[error("unterminated placeholder in: {0}")]
    Unterminated(String),
}

/// Capability that substitutes placeholders in a template string
///
/// Implementations must be synchronous and side-effect free.
pub trait TemplateResolver: Send + Sync {
    /// Replace every placeholder in `template` using `scope`
    fn replace(&self, template: &str, scope: &ScopedVars) -> Result<String, TemplateError>;
}

impl<R: TemplateResolver + ?Sized> TemplateResolver for std::sync::Arc<R> {
    fn replace(&self, template: &str, scope: &ScopedVars) -> Result<String, TemplateError> {
        (**self).replace(template, scope)
    }
}
