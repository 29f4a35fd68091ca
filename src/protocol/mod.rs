//! RQL Protocol Implementation
//!
//! This module implements the text side of the query pipeline: turning a
//! client's request into statements and statement outcomes into lines.
//!
//! ## Modules
//!
//! - `lexer`: Tokenizer for raw request text
//! - `parser`: Recursive-descent parser producing an [`Ast`]
//! - `types`: Statements, the `Ast`, and the `Response` lines
//!
//! ## Example
//!
//! ```
//! use rqldb::protocol::{parse, Response, Statement};
//!
//! let ast = parse("GET data data1;").unwrap();
//! assert!(matches!(&ast.statements[0], Statement::Get(g) if g.keys.len() == 2));
//!
//! let line = Response::Values(vec![None, None]).serialize();
//! assert_eq!(line, b"[(nil), (nil)]\n");
//! ```

pub mod lexer;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use lexer::{tokenize, Keyword, LexError, Lexer, Position, Token, TokenKind};
pub use parser::{parse, ParseError, ParseResult};
pub use types::{
    Ast, AuthStatement, DeleteStatement, GetStatement, Response, SetStatement, Statement,
};
