use std::path::PathBuf;

use bakeweave_lexer::LineReaderErrorKind;
use bakeweave_syntax::StatementError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Statement(#[from] StatementError),
    #[error("shell function {0} is never closed")]
    UnclosedFunction(String),
    #[error("line continuation at end of file")]
    UnterminatedContinuation,
    #[error("{} is already being parsed; recursive inclusion", .0.display())]
    RecursiveInclusion(PathBuf),
    #[error("could not {directive} file {file}")]
    MissingFile {
        directive: &'static str,
        file: String,
    },
    #[error("could not inherit file {0}")]
    MissingClass(String),
    #[error("not a BitBake file: {}", .0.display())]
    UnsupportedFile(PathBuf),
}

/// A syntax-level failure. Parsing of the file stops at the first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ParseError at {}:{line}: {kind}", file.display())]
pub struct ParseError {
    pub file: PathBuf,
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandledFailureKind {
    #[error(transparent)]
    LineReader(LineReaderErrorKind),
    #[error(
        "the classname {class} contains a dash character and is calling an sh function {function} \
         using EXPORT_FUNCTIONS; a dash is illegal in sh function names, so rename the class or \
         don't use EXPORT_FUNCTIONS"
    )]
    DashInClassName { class: String, function: String },
}

/// Well-formed but ambiguous metadata that must be fixed by the author before it is accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}:{line}: {kind}", file.display())]
pub struct HandledFailure {
    pub file: PathBuf,
    pub line: usize,
    pub kind: HandledFailureKind,
}

/// Raised by a function executor to mark the recipe (or one of its variants) as skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("recipe skipped: {0}")]
pub struct SkipRecipe(pub String);
