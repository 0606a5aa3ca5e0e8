use thiserror::Error;

/// Errors surfaced by the fallible entry points of the runtime: loading
/// configuration, parsing documents and reading component definitions.
///
/// Usage errors during instantiation and mounting never show up here; those
/// are reported through [`crate::debug::warn`] and the operation returns the
/// instance untouched.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid runtime config: {0}")]
    Config(#[source] serde_json::Error),

    #[error("invalid component definition: {0}")]
    Definition(#[source] serde_json::Error),

    #[error("failed to parse HTML document: {0}")]
    Document(#[from] std::io::Error),
}

/// Error reported by a [`crate::compiler::TemplateCompiler`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to compile template: {message}")]
pub struct CompileError {
    pub message: String,
    /// Offending source range, when the compiler retained source locations.
    pub range: Option<(usize, usize)>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            range: None,
        }
    }

    pub fn with_range(mut self, start: usize, end: usize) -> Self {
        self.range = Some((start, end));
        self
    }
}

/// Error returned from a lifecycle hook. Hooks never abort initialization;
/// the error is routed to [`crate::debug::handle_error`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

pub type HookResult = Result<(), HookError>;
