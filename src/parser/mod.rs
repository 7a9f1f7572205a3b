//! Reader for thing definition documents (an XML subset)

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::parse;
