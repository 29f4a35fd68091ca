//! RQL Parser
//!
//! A recursive-descent parser that turns the lexer's token stream into an
//! [`Ast`]. The parser is independent of execution: it never touches a store,
//! and it returns an `Ast` only when the whole request parsed.
//!
//! ## Grammar
//!
//! ```text
//! program    := statement (';' statement)* ';'?
//! statement  := 'SET' KEY value [NUMBER]
//!             | 'GET' KEY+
//!             | 'DEL' KEY+
//!             | 'AUTH' KEY value
//! KEY        := IDENT | NUMBER
//! value      := STRING | IDENT | NUMBER
//! ```
//!
//! An empty request parses to an empty `Ast`.

use crate::protocol::lexer::{tokenize, Keyword, LexError, Position, Token, TokenKind};
use crate::protocol::types::{
    AuthStatement, Ast, DeleteStatement, GetStatement, SetStatement, Statement,
};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text could not be tokenized
    #[error(transparent)]
    Lex(#[from] LexError),

    /// A token appeared where the grammar does not allow it
    #[error("unexpected {found} at {position}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        position: Position,
    },

    /// A TTL literal does not fit in 64-bit milliseconds
    #[error("invalid ttl '{literal}' at {position}")]
    InvalidTtl { literal: String, position: Position },
}

impl ParseError {
    fn unexpected(token: &Token, expected: &'static str) -> Self {
        ParseError::UnexpectedToken {
            found: token.to_string(),
            expected,
            position: token.position,
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a whole request into its statements.
///
/// # Example
///
/// ```
/// use rqldb::protocol::{parse, Statement};
///
/// let ast = parse(r#"SET data "Hello World" 234;"#).unwrap();
/// assert!(matches!(&ast.statements[0], Statement::Set(s) if s.value == "Hello World"));
/// ```
pub fn parse(src: &str) -> ParseResult<Ast> {
    let tokens = tokenize(src)?;
    Parser::new(tokens).parse_program()
}

/// Cursor over a token sequence that always ends in `Eof`.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(tokens.last().is_some_and(|t| t.kind == TokenKind::Eof));
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        // The final Eof is never consumed, so the cursor stays in bounds.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn parse_program(&mut self) -> ParseResult<Ast> {
        let mut statements = Vec::new();

        while !self.at(TokenKind::Eof) {
            statements.push(self.parse_statement()?);

            match self.peek().kind {
                TokenKind::Terminator => {
                    self.advance();
                }
                TokenKind::Eof => {}
                _ => return Err(ParseError::unexpected(self.peek(), "';'")),
            }
        }

        Ok(Ast { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let token = self.advance();
        match token.kind {
            TokenKind::Keyword(Keyword::Set) => self.parse_set(),
            TokenKind::Keyword(Keyword::Get) => Ok(Statement::Get(GetStatement {
                keys: self.parse_keys()?,
            })),
            TokenKind::Keyword(Keyword::Del) => Ok(Statement::Delete(DeleteStatement {
                keys: self.parse_keys()?,
            })),
            TokenKind::Keyword(Keyword::Auth) => self.parse_auth(),
            _ => Err(ParseError::unexpected(&token, "SET, GET, DEL or AUTH")),
        }
    }

    /// `SET KEY value [NUMBER]`
    fn parse_set(&mut self) -> ParseResult<Statement> {
        let key = self.parse_key()?;
        let value = self.parse_value()?;

        let ttl = if self.at(TokenKind::Number) {
            let token = self.advance();
            let millis: u64 = token.literal.parse().map_err(|_| ParseError::InvalidTtl {
                literal: token.literal.clone(),
                position: token.position,
            })?;
            Some(Duration::from_millis(millis))
        } else {
            None
        };

        Ok(Statement::Set(SetStatement { key, value, ttl }))
    }

    /// `AUTH KEY value`
    fn parse_auth(&mut self) -> ParseResult<Statement> {
        let username = self.parse_key()?;
        let password = self.parse_value()?;
        Ok(Statement::Auth(AuthStatement { username, password }))
    }

    /// `KEY+`, greedy until a non-key token.
    fn parse_keys(&mut self) -> ParseResult<Vec<String>> {
        let mut keys = vec![self.parse_key()?];
        while self.peek().is_bare() {
            keys.push(self.advance().literal);
        }
        Ok(keys)
    }

    fn parse_key(&mut self) -> ParseResult<String> {
        if self.peek().is_bare() {
            Ok(self.advance().literal)
        } else {
            Err(ParseError::unexpected(self.peek(), "key"))
        }
    }

    fn parse_value(&mut self) -> ParseResult<String> {
        match self.peek().kind {
            TokenKind::String | TokenKind::Ident | TokenKind::Number => Ok(self.advance().literal),
            _ => Err(ParseError::unexpected(self.peek(), "value")),
        }
    }
}
