//! The error taxonomy shared by every compilation stage.
//!
//! Each stage (lexer excluded - see `crate::lexer`) reports failures through this single enum so
//! the build driver can format a `BuildResult` without caring which stage produced the error.

use std::fmt;
use std::path::PathBuf;

/// A source position as tracked by the lexer/parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Parser mismatch: expected-kind, actual kind+lexeme, line, column.
    Syntax {
        expected: String,
        actual: String,
        position: Option<Position>,
    },
    /// Undefined name, or a name resolved to the wrong symbol kind.
    Resolution { message: String },
    /// Type mismatch, non-bool condition, void-typed variable, bad return.
    Type { message: String },
    /// Call or constructor argument count mismatch.
    Arity { message: String },
    /// Unsupported construct or unknown type name at codegen time.
    Lowering { message: String },
    /// File not readable, output path not writable.
    Io { message: String },
    /// External linker missing or failed.
    Link { message: String },
}

impl CompileError {
    pub fn syntax(expected: impl Into<String>, actual: impl Into<String>, position: Option<Position>) -> Self {
        CompileError::Syntax {
            expected: expected.into(),
            actual: actual.into(),
            position,
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        CompileError::Resolution { message: message.into() }
    }

    pub fn ty(message: impl Into<String>) -> Self {
        CompileError::Type { message: message.into() }
    }

    pub fn arity(message: impl Into<String>) -> Self {
        CompileError::Arity { message: message.into() }
    }

    pub fn lowering(message: impl Into<String>) -> Self {
        CompileError::Lowering { message: message.into() }
    }

    pub fn io(message: impl Into<String>) -> Self {
        CompileError::Io { message: message.into() }
    }

    pub fn link(message: impl Into<String>) -> Self {
        CompileError::Link { message: message.into() }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Syntax { expected, actual, position } => {
                if let Some(pos) = position {
                    write!(f, "syntax error at {pos}: expected {expected}, found {actual}")
                } else {
                    write!(f, "syntax error: expected {expected}, found {actual}")
                }
            }
            CompileError::Resolution { message } => write!(f, "resolution error: {message}"),
            CompileError::Type { message } => write!(f, "type error: {message}"),
            CompileError::Arity { message } => write!(f, "arity error: {message}"),
            CompileError::Lowering { message } => write!(f, "lowering error: {message}"),
            CompileError::Io { message } => write!(f, "io error: {message}"),
            CompileError::Link { message } => write!(f, "link error: {message}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::io(err.to_string())
    }
}

/// A file path annotated error, used by the build driver when reporting which file failed.
#[derive(Debug, Clone)]
pub struct FileError {
    pub file: PathBuf,
    pub error: CompileError,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file.display(), self.error)
    }
}
