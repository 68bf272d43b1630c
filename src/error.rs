//! Error types for the engine.

use std::fmt;

use crate::game::Location;

/// How many characters of remaining input a parse diagnostic carries.
pub const EXCERPT_LEN: usize = 80;

/// Malformed scenario markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line of the failure.
    pub line: usize,
    /// 1-based column of the failure.
    pub column: usize,
    /// What the parser was looking for.
    pub expected: &'static str,
    /// Up to [`EXCERPT_LEN`] characters of input from the failure point.
    pub excerpt: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error at line {}, column {}: expected {} here: \"{}\"",
            self.line, self.column, self.expected, self.excerpt
        )
    }
}

impl std::error::Error for ParseError {}

/// Failures of the macro-strip pass that runs before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessError {
    /// A `#define` opened inside another `#define` region.
    NestedDefine {
        /// Line of the inner `#define`.
        line: usize,
        /// Line of the define region it is nested inside.
        outer_line: usize,
    },
    /// A `#define` region was never closed.
    UnterminatedDefine {
        /// Line of the opening `#define`.
        line: usize,
    },
    /// An `#enddef` with no open define region.
    EnddefWithoutDefine {
        /// Line of the stray `#enddef`.
        line: usize,
    },
    /// A `}` with no matching `{`.
    UnmatchedBrace {
        /// Line of the stray `}`.
        line: usize,
    },
    /// A `{` still open at end of input.
    UnclosedBrace {
        /// Line of the unmatched `{`.
        line: usize,
    },
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::NestedDefine { line, outer_line } => write!(
                f,
                "nested #define at line {line} (inside the define opened at line {outer_line})"
            ),
            PreprocessError::UnterminatedDefine { line } => {
                write!(f, "#define at line {line} is never closed by #enddef")
            }
            PreprocessError::EnddefWithoutDefine { line } => {
                write!(f, "#enddef at line {line} with no open #define")
            }
            PreprocessError::UnmatchedBrace { line } => {
                write!(f, "unmatched '}}' at line {line}")
            }
            PreprocessError::UnclosedBrace { line } => {
                write!(f, "'{{' at line {line} is never closed")
            }
        }
    }
}

impl std::error::Error for PreprocessError {}

/// What went wrong while compiling script source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLoadKind {
    /// The source did not parse.
    Syntax,
    /// The interpreter ran out of memory.
    Memory,
    /// A garbage-collection metamethod failed during compilation.
    GcMetamethod,
    /// Anything the interpreter did not classify.
    Unknown,
}

/// What went wrong during a protected script call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptRunKind {
    /// An ordinary runtime error.
    Runtime,
    /// A failure inside the error handler or a debug hook.
    DebugHook,
    /// The interpreter ran out of memory.
    Memory,
    /// A garbage-collection metamethod failed.
    GcMetamethod,
    /// Anything the interpreter did not classify.
    Unknown,
}

/// A failure on the script side of the host boundary.
///
/// No script error ever crosses the boundary as a panic or an unwind; it is
/// captured and carried here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Compiling script source failed.
    Load {
        /// Failure classification.
        kind: ScriptLoadKind,
        /// Interpreter message.
        message: String,
    },
    /// A protected call failed at runtime.
    Runtime {
        /// Failure classification.
        kind: ScriptRunKind,
        /// Interpreter message.
        message: String,
    },
}

impl ScriptError {
    /// Classify an interpreter error raised while compiling a chunk.
    pub(crate) fn from_load(err: &mlua::Error) -> Self {
        match err {
            mlua::Error::SyntaxError { message, .. } => ScriptError::Load {
                kind: ScriptLoadKind::Syntax,
                message: message.clone(),
            },
            mlua::Error::MemoryError(message) => ScriptError::Load {
                kind: ScriptLoadKind::Memory,
                message: message.clone(),
            },
            other => ScriptError::Load {
                kind: ScriptLoadKind::Unknown,
                message: other.to_string(),
            },
        }
    }

    /// Classify an interpreter error raised during a protected call.
    pub(crate) fn from_call(err: &mlua::Error) -> Self {
        match err {
            mlua::Error::RuntimeError(message) => ScriptError::Runtime {
                kind: ScriptRunKind::Runtime,
                message: message.clone(),
            },
            mlua::Error::MemoryError(message) => ScriptError::Runtime {
                kind: ScriptRunKind::Memory,
                message: message.clone(),
            },
            mlua::Error::CallbackError { cause, .. } => ScriptError::from_call(cause),
            mlua::Error::SyntaxError { message, .. } => ScriptError::Runtime {
                kind: ScriptRunKind::Runtime,
                message: message.clone(),
            },
            other => ScriptError::Runtime {
                kind: ScriptRunKind::Unknown,
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Load { kind, message } => {
                let what = match kind {
                    ScriptLoadKind::Syntax => "a syntax error",
                    ScriptLoadKind::Memory => "a memory error",
                    ScriptLoadKind::GcMetamethod => "an error in a gc metamethod",
                    ScriptLoadKind::Unknown => "an unknown error",
                };
                write!(f, "when compiling script, {what}: {message}")
            }
            ScriptError::Runtime { kind, message } => {
                let what = match kind {
                    ScriptRunKind::Runtime => "runtime error",
                    ScriptRunKind::DebugHook => "error in the attached error handler",
                    ScriptRunKind::Memory => "out of memory",
                    ScriptRunKind::GcMetamethod => "error in a gc metamethod",
                    ScriptRunKind::Unknown => "unknown error",
                };
                write!(f, "when executing script, {what}: {message}")
            }
        }
    }
}

impl std::error::Error for ScriptError {}

/// A pathfinding query that could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// The destination is not in the shortest-path tree.
    Unreachable {
        /// The hex that could not be reached.
        destination: Location,
    },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Unreachable { destination } => {
                write!(f, "destination {destination} is unreachable")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// A Lua value whose shape violates the config round-trip format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    /// What the bridge expected at this position.
    pub expected: &'static str,
    /// What it found instead.
    pub found: String,
}

impl ShapeError {
    pub(crate) fn new(expected: &'static str, found: impl Into<String>) -> Self {
        Self {
            expected,
            found: found.into(),
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config shape violation: expected {}, found {}",
            self.expected, self.found
        )
    }
}

impl std::error::Error for ShapeError {}

/// Failure of a report evaluation: either the script or the result shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The script fragment failed to compile or run.
    Script(ScriptError),
    /// The fragment's result did not have config shape.
    Shape(ShapeError),
}

impl From<ScriptError> for ReportError {
    fn from(err: ScriptError) -> Self {
        ReportError::Script(err)
    }
}

impl From<ShapeError> for ReportError {
    fn from(err: ShapeError) -> Self {
        ReportError::Shape(err)
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Script(e) => e.fmt(f),
            ReportError::Shape(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ReportError {}
