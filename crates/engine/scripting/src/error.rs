//! Error types for the scripting system

use std::sync::Arc;
use thiserror::Error;

/// Result type for scripting operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the scripting system
#[derive(Error, Debug)]
pub enum Error {
    /// Script source failed to compile
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Script raised while running
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Value cannot cross the interpreter boundary
    #[error("Marshal error: {0}")]
    Marshal(String),

    /// Type conversion error
    #[error("Type error: expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    /// Interpreter state has been closed
    #[error("Interpreter state is closed")]
    Closed,

    /// KDL parsing error
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Script file not found
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    /// Script node broke its graph contract
    #[error("Node graph error: {0}")]
    Graph(#[from] logic::Error),
}

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Runtime,
    Marshal,
    Closed,
    Config,
    Io,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Marshal => "marshal",
            ErrorKind::Closed => "closed",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Syntax(_) => ErrorKind::Syntax,
            Error::Runtime(_) | Error::Graph(_) => ErrorKind::Runtime,
            Error::Marshal(_) | Error::TypeError { .. } | Error::Json(_) => ErrorKind::Marshal,
            Error::Closed => ErrorKind::Closed,
            Error::KdlParse(_) | Error::InvalidConfig(_) => ErrorKind::Config,
            Error::Io(_) | Error::ScriptNotFound(_) => ErrorKind::Io,
        }
    }

    /// Message text without the kind prefix
    pub fn message(&self) -> String {
        match self {
            Error::Syntax(msg) | Error::Runtime(msg) | Error::Marshal(msg) => msg.clone(),
            Error::InvalidConfig(msg) | Error::ScriptNotFound(msg) => msg.clone(),
            Error::TypeError { expected, actual } => {
                format!("expected {}, got {}", expected, actual)
            }
            Error::Closed => "interpreter state is closed".to_string(),
            Error::KdlParse(e) => e.to_string(),
            Error::Io(e) => e.to_string(),
            Error::Json(e) => e.to_string(),
            Error::Graph(e) => e.to_string(),
        }
    }

    /// Rebuild an error of the same kind from a shared reference
    fn reclassify(&self) -> Error {
        match self.kind() {
            ErrorKind::Syntax => Error::Syntax(self.message()),
            ErrorKind::Marshal => Error::Marshal(self.message()),
            ErrorKind::Closed => Error::Closed,
            _ => Error::Runtime(self.message()),
        }
    }
}

impl From<mlua::Error> for Error {
    fn from(err: mlua::Error) -> Self {
        classify(&err)
    }
}

fn classify(err: &mlua::Error) -> Error {
    match err {
        mlua::Error::SyntaxError { message, .. } => Error::Syntax(message.clone()),
        mlua::Error::RuntimeError(msg) => Error::Runtime(msg.clone()),
        mlua::Error::MemoryError(msg) => Error::Runtime(format!("out of memory: {}", msg)),
        mlua::Error::CallbackError { cause, .. } => classify(cause),
        mlua::Error::ExternalError(inner) => external(inner),
        mlua::Error::FromLuaConversionError { .. } | mlua::Error::ToLuaConversionError { .. } => {
            Error::Marshal(err.to_string())
        }
        other => Error::Runtime(other.to_string()),
    }
}

fn external(inner: &Arc<dyn std::error::Error>) -> Error {
    match inner.downcast_ref::<Error>() {
        Some(ours) => ours.reclassify(),
        None => Error::Runtime(inner.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_classified() {
        let err = Error::from(mlua::Error::SyntaxError {
            message: "[string]:1: unexpected symbol".to_string(),
            incomplete_input: false,
        });
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(err.message().contains("unexpected symbol"));
    }

    #[test]
    fn test_external_error_keeps_kind() {
        let lua_err = mlua::Error::external(Error::Marshal("cyclic table".to_string()));
        let err = Error::from(lua_err);
        assert_eq!(err.kind(), ErrorKind::Marshal);
        assert_eq!(err.message(), "cyclic table");
    }

    #[test]
    fn test_callback_error_unwrapped() {
        let cause = mlua::Error::external(Error::Runtime("boom".to_string()));
        let err = Error::from(mlua::Error::CallbackError {
            traceback: String::new(),
            cause: Arc::new(cause),
        });
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.message(), "boom");
    }
}
