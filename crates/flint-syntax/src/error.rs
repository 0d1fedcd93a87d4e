//! Error handling for the Flint toolchain.
//!
//! A compilation failure is a [`Category`] naming which stage rejected the
//! input, a message, and, when the error points at source text, a 1-based
//! line/column pair. The category doubles as the heading the driver prints
//! in front of the diagnostic. The first error aborts the compilation;
//! nothing is recovered. Bugs inside the compiler are not represented here,
//! they panic.
//!
//! # Examples
//!
//! ```rust
//! use flint_syntax::error::{Category, Error};
//!
//! let err = Error::syntax("Expected ';'", 3, 14);
//! assert_eq!(err.category, Category::Syntax);
//! assert_eq!(err.span, Some((3, 14)));
//! assert_eq!(err.to_string(), "parse error: Expected ';' at 3:14");
//!
//! let err = Error::driver("'ld' failed on out.o");
//! assert_eq!(err.to_string(), "error: 'ld' failed on out.o");
//! ```

use std::fmt;

/// The kind of compilation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Unrecognized characters, malformed integers.
    Lexical,
    /// Unexpected token kinds, unexpected end of input.
    Syntax,
    /// Undeclared variables, undefined functions, misplaced `return`s.
    Name,
    /// Rejected at emission time, e.g. duplicate function definitions.
    Codegen,
    /// Everything around the pipeline: I/O, assembler, linker.
    Driver,
}

impl Category {
    /// Heading used when the diagnostic is rendered.
    pub fn label(self) -> &'static str {
        match self {
            Category::Lexical => "lex error",
            Category::Syntax => "parse error",
            Category::Name => "name error",
            Category::Codegen => "codegen error",
            Category::Driver => "error",
        }
    }
}

/// A fatal compilation error.
#[derive(Debug, Clone)]
pub struct Error {
    pub category: Category,
    /// Human-readable error message.
    pub msg: String,
    /// 1-based (line, column) of the offending source text, if the error
    /// points at any.
    pub span: Option<(usize, usize)>,
}

impl Error {
    fn at(category: Category, msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            category,
            msg: msg.into(),
            span: Some((line, col)),
        }
    }

    /// A lexical error anchored at the offending character or lexeme.
    pub fn lexical(msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self::at(Category::Lexical, msg, line, col)
    }

    /// A syntax error anchored at the unexpected token.
    pub fn syntax(msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self::at(Category::Syntax, msg, line, col)
    }

    /// A name-resolution error anchored at the offending use.
    pub fn name(msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self::at(Category::Name, msg, line, col)
    }

    /// A code-generation error. These carry no span; the generator works on
    /// the tree, not on source text.
    pub fn codegen(msg: impl Into<String>) -> Self {
        Self {
            category: Category::Codegen,
            msg: msg.into(),
            span: None,
        }
    }

    /// A driver error: I/O or an external tool failure.
    pub fn driver(msg: impl Into<String>) -> Self {
        Self {
            category: Category::Driver,
            msg: msg.into(),
            span: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category.label(), self.msg)?;
        if let Some((line, col)) = self.span {
            write!(f, " at {line}:{col}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` used throughout the toolchain.
pub type Result<T> = std::result::Result<T, Error>;
