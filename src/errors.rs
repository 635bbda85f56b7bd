use thiserror::Error;

// Every failure the engine can report, grouped by when it surfaces
#[derive(Debug, Error)]
pub enum EvalError {
    // Malformed path grammar, raised the first time a path is parsed
    #[error("parse error: {0}")]
    Parse(String),

    // Grammar that parses but is not supported (`[*]`, `3:`, unknown function, ...)
    #[error("configuration error: {0}")]
    Config(String),

    // An aggregate function rejected its input
    #[error("function '{function}' error: {message}")]
    Function { function: String, message: String },

    // Extraction helpers that need a single, well-shaped match
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl EvalError {
    pub(crate) fn function(function: &str, message: impl Into<String>) -> Self {
        EvalError::Function {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

// Type alias for results that use `EvalError` as the error type
pub type Result<T> = std::result::Result<T, EvalError>;
