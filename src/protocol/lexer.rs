//! RQL Lexer
//!
//! Turns raw request text into a flat sequence of tokens. The lexer knows
//! nothing about statement structure: it only classifies runs of characters.
//!
//! ## Token Rules
//!
//! ```text
//! whitespace          separator, discarded (newlines included)
//! ;                   Terminator
//! "..."               String (no escapes, the next quote closes it)
//! SET | GET | DEL | AUTH
//!                     Keyword (case-sensitive, whole word)
//! [0-9]+              Number
//! anything else       Ident (run of non-space, non-quote, non-';' chars)
//! ```
//!
//! Lexing only fails on an unterminated string literal. Every other input
//! tokenizes; meaningless sequences are rejected later by the parser.

use std::fmt;
use thiserror::Error;

/// A location in the request text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset into the source
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
}

impl Position {
    fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Reserved statement keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Set,
    Get,
    Del,
    Auth,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        match word {
            "SET" => Some(Keyword::Set),
            "GET" => Some(Keyword::Get),
            "DEL" => Some(Keyword::Del),
            "AUTH" => Some(Keyword::Auth),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Set => "SET",
            Keyword::Get => "GET",
            Keyword::Del => "DEL",
            Keyword::Auth => "AUTH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident,
    String,
    Number,
    Terminator,
    Eof,
}

/// A classified run of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The token's text. For string literals this excludes the quotes.
    pub literal: String,
    pub position: Position,
}

impl Token {
    /// Whether this token can stand in a key position (a bare word).
    pub fn is_bare(&self) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Number)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Keyword(kw) => write!(f, "keyword {}", kw.as_str()),
            TokenKind::Ident => write!(f, "identifier '{}'", self.literal),
            TokenKind::String => write!(f, "string \"{}\"", self.literal),
            TokenKind::Number => write!(f, "number {}", self.literal),
            TokenKind::Terminator => write!(f, "';'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// Errors raised while tokenizing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated string literal starting at {0}")]
    UnterminatedString(Position),
}

/// Tokenizes a whole request. The returned sequence always ends with `Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src).collect()
}

/// A streaming tokenizer over one request's text.
///
/// Iteration yields tokens up to and including `Eof`, then stops. After a
/// `LexError` the iterator is fused.
pub struct Lexer<'a> {
    src: &'a str,
    position: Position,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            position: Position::start(),
            done: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.position.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position.offset += c.len_utf8();
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.position;
        let c = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    literal: String::new(),
                    position: start,
                })
            }
        };

        match c {
            ';' => {
                self.bump();
                Ok(Token {
                    kind: TokenKind::Terminator,
                    literal: ";".to_string(),
                    position: start,
                })
            }
            '"' => self.read_string(start),
            _ => Ok(self.read_word(start)),
        }
    }

    fn read_string(&mut self, start: Position) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let body_start = self.position.offset;

        loop {
            match self.bump() {
                Some('"') => {
                    let body_end = self.position.offset - 1;
                    return Ok(Token {
                        kind: TokenKind::String,
                        literal: self.src[body_start..body_end].to_string(),
                        position: start,
                    });
                }
                Some(_) => {}
                None => return Err(LexError::UnterminatedString(start)),
            }
        }
    }

    fn read_word(&mut self, start: Position) -> Token {
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != '"' && c != ';')
        {
            self.bump();
        }

        let word = &self.src[start.offset..self.position.offset];
        let kind = if let Some(kw) = Keyword::lookup(word) {
            TokenKind::Keyword(kw)
        } else if word.bytes().all(|b| b.is_ascii_digit()) {
            TokenKind::Number
        } else {
            TokenKind::Ident
        };

        Token {
            kind,
            literal: word.to_string(),
            position: start,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let token = self.next_token();
        match &token {
            Ok(t) if t.kind == TokenKind::Eof => self.done = true,
            Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_set_statement_tokens() {
        let tokens = tokenize(r#"SET data "Hello World" 234;"#).unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Keyword(Keyword::Set),
                TokenKind::Ident,
                TokenKind::String,
                TokenKind::Number,
                TokenKind::Terminator,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].literal, "data");
        assert_eq!(tokens[2].literal, "Hello World");
        assert_eq!(tokens[3].literal, "234");
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(
            kinds("set Get DEL"),
            vec![
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Keyword(Keyword::Del),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        assert_eq!(kinds("SETX GET1"), vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn test_terminator_splits_words() {
        let tokens = tokenize("GET a;GET b").unwrap();
        let literals: Vec<_> = tokens.iter().map(|t| t.literal.as_str()).collect();
        assert_eq!(literals, vec!["GET", "a", ";", "GET", "b", ""]);
    }

    #[test]
    fn test_quote_ends_bare_word() {
        let tokens = tokenize(r#"ab"cd""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].literal, "ab");
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].literal, "cd");
    }

    #[test]
    fn test_mixed_digits_is_ident() {
        assert_eq!(kinds("12ab 0042"), vec![TokenKind::Ident, TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn test_string_keeps_inner_whitespace_and_semicolons() {
        let tokens = tokenize("\"a ; b\n c\"").unwrap();
        assert_eq!(tokens[0].literal, "a ; b\n c");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_empty_string_literal() {
        let tokens = tokenize(r#""""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, "");
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("SET a \"oops").unwrap_err();
        assert_eq!(
            err,
            LexError::UnterminatedString(Position {
                offset: 6,
                line: 1,
                column: 7,
            })
        );
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = tokenize("GET a;\n  GET b;").unwrap();
        let second_get = &tokens[3];
        assert_eq!(second_get.kind, TokenKind::Keyword(Keyword::Get));
        assert_eq!(second_get.position.line, 2);
        assert_eq!(second_get.position.column, 3);
        assert_eq!(second_get.position.offset, 9);
    }

    #[test]
    fn test_unicode_values() {
        let tokens = tokenize("SET clé \"héllo wörld\";").unwrap();
        assert_eq!(tokens[1].literal, "clé");
        assert_eq!(tokens[2].literal, "héllo wörld");
    }
}
