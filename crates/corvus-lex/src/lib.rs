//! corvus-lex - Lexical analyzer.
//!
//! Transforms source text into a stream of [`token::Token`]s. The lexer is an
//! external collaborator of the compiler core: `corvus-sem` consumes
//! `corvus-par`'s AST, which in turn is built by a parser driving this
//! crate's [`lexer::Lexer`] over a [`cursor::Cursor`].

pub mod cursor;
pub mod edge_cases;
pub mod lexer;
pub mod token;
pub mod unicode;

pub use lexer::Lexer;
pub use token::{keyword_from_ident, Token};
