//! RQL Statement and Response Types
//!
//! This module defines the values that flow through the query pipeline:
//! the parsed statements a request is made of, and the one-line responses
//! the driver writes back for each of them.
//!
//! ## Response Format
//!
//! Every statement produces exactly one newline-terminated line:
//!
//! - `SET` → `Success`
//! - `GET k1 k2` → `["v1", (nil)]`
//! - `DEL k1 k2` → `Success`
//! - `AUTH user pass` → `Successfully authenticated` or `Invalid Credentials`
//! - lex/parse failure or denied statement → `ERROR: <message>`
//!
//! Line feeds and carriage returns inside a value or message are written as
//! `\n` and `\r`. Inside a quoted `GET` value, `"` and `\` are escaped with
//! a backslash.

use bytes::Bytes;
use std::fmt;
use std::time::Duration;

/// The line terminator written after every response.
pub const LF: &[u8] = b"\n";

/// Marker rendered in a `GET` response for a key with no live value.
pub const NIL: &str = "(nil)";

/// `SET key value [ttl]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetStatement {
    pub key: String,
    pub value: String,
    /// Explicit time-to-live. `None` means the store's default expiry applies.
    pub ttl: Option<Duration>,
}

/// `GET key [key ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStatement {
    pub keys: Vec<String>,
}

/// `DEL key [key ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteStatement {
    pub keys: Vec<String>,
}

/// `AUTH username password`
#[derive(Clone, PartialEq, Eq)]
pub struct AuthStatement {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AuthStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthStatement")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A single parsed RQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Set(SetStatement),
    Get(GetStatement),
    Delete(DeleteStatement),
    Auth(AuthStatement),
}

impl Statement {
    /// The keyword that introduced this statement, for logging.
    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::Set(_) => "SET",
            Statement::Get(_) => "GET",
            Statement::Delete(_) => "DEL",
            Statement::Auth(_) => "AUTH",
        }
    }
}

/// The statements of one request, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ast {
    pub statements: Vec<Statement>,
}

impl Ast {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl IntoIterator for Ast {
    type Item = Statement;
    type IntoIter = std::vec::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

/// The outcome of one statement, rendered as a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A write or delete completed.
    Success,

    /// The values for a `GET`, positionally aligned with the requested keys.
    /// `None` marks a key that is missing or expired.
    Values(Vec<Option<Bytes>>),

    /// `AUTH` matched a registered user.
    Authenticated,

    /// `AUTH` did not match.
    InvalidCredentials,

    /// The request could not be lexed or parsed, or a statement was denied.
    Error(String),
}

impl Response {
    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error(msg.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Serializes the response to its wire line, including the terminator.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Response::Success => buf.extend_from_slice(b"Success"),
            Response::Authenticated => buf.extend_from_slice(b"Successfully authenticated"),
            Response::InvalidCredentials => buf.extend_from_slice(b"Invalid Credentials"),
            Response::Error(msg) => {
                buf.extend_from_slice(b"ERROR: ");
                push_escaped(buf, msg.as_bytes(), false);
            }
            Response::Values(values) => {
                buf.push(b'[');
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        buf.extend_from_slice(b", ");
                    }
                    match value {
                        Some(data) => {
                            buf.push(b'"');
                            push_escaped(buf, data, true);
                            buf.push(b'"');
                        }
                        None => buf.extend_from_slice(NIL.as_bytes()),
                    }
                }
                buf.push(b']');
            }
        }
        buf.extend_from_slice(LF);
    }
}

/// Appends `data` with line breaks written as `\n` and `\r`, so a response
/// never spans more than one line. Inside a quoted value `"` and `\` are
/// backslash-escaped as well.
fn push_escaped(buf: &mut Vec<u8>, data: &[u8], quoted: bool) {
    for &byte in data {
        match byte {
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'"' | b'\\' if quoted => {
                buf.push(b'\\');
                buf.push(byte);
            }
            _ => buf.push(byte),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.serialize();
        let line = &line[..line.len() - LF.len()];
        f.write_str(&String::from_utf8_lossy(line))
    }
}
