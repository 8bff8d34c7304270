//! SQL front end
//!
//! Tokenizing, parsing, the AST with its SQL formatting, and identifier quoting.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod quote;
pub mod token;

pub use ast::Statement;
pub use lexer::Lexer;
pub use parser::Parser;
pub use quote::{quote_name, quote_names, quote_qualified};
pub use token::Token;
