//! Flint language syntax definitions.
//!
//! Foundation crate for the Flint toolchain: token kinds produced by the
//! lexer, the abstract syntax tree built by the parser and read by the code
//! generator, and the shared error type every phase reports through.
//!
//! The pipeline layers on top of these types:
//!
//! ```text
//! source text --(flint-lexer)--> Vec<Token>
//!             --(flint-parser)--> Program
//!             --(flint-codegen)--> x86-64 assembly text
//! ```

pub mod ast;
pub mod error;
pub mod token;

pub use ast::*;
pub use error::*;
pub use token::*;
