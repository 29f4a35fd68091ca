//! RQL Driver
//!
//! The driver sits between a client connection and the database: it parses a
//! request, runs each statement against a [`Database`], and writes one
//! response line per statement to an output sink.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Driver<D>                            │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   parse()   │───>│  execute()  │───>│ write line  │     │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                    D: Database (Session)                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are written and flushed as each statement completes, so a client
//! sees earlier results before later statements in the same request run.

use crate::protocol::{parse, Response, Statement};
use crate::security::AccessDenied;
use bytes::Bytes;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// The operations the driver needs from the layer below it.
///
/// The driver is not tied to one implementation: anything that can store,
/// fetch, remove and authenticate will do. In the server this is a
/// [`Session`](crate::security::Session).
///
/// Data operations fail only with [`AccessDenied`], which the driver renders
/// as an `ERROR:` line for that statement.
pub trait Database {
    /// Stores `value` under `key`. `ttl` of `None` means the store's default expiry.
    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), AccessDenied>;

    /// Returns the live value for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Bytes>, AccessDenied>;

    /// Removes `key`, returning whether it existed.
    fn delete(&self, key: &str) -> Result<bool, AccessDenied>;

    /// Checks credentials, updating the caller's authentication state on success.
    fn authenticate(&mut self, username: &str, password: &str) -> bool;
}

/// Executes RQL requests for one client.
#[derive(Debug)]
pub struct Driver<D> {
    db: D,
}

impl<D: Database> Driver<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    /// Runs every statement in `src`, writing one line per statement to `out`.
    ///
    /// A request that does not parse produces a single `ERROR:` line and no
    /// statement runs. An empty request writes nothing.
    ///
    /// # Returns
    ///
    /// The number of statements executed.
    pub async fn operate<W>(&mut self, src: &str, out: &mut W) -> io::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let ast = match parse(src) {
            Ok(ast) => ast,
            Err(e) => {
                debug!(error = %e, "Rejected request");
                write_line(out, &Response::error(e.to_string())).await?;
                return Ok(0);
            }
        };

        let count = ast.len();
        for statement in ast {
            let response = self.execute(statement);
            write_line(out, &response).await?;
        }

        Ok(count)
    }

    /// Executes a single statement.
    pub fn execute(&mut self, statement: Statement) -> Response {
        trace!(statement = statement.keyword(), "Executing statement");

        let result = match statement {
            Statement::Set(stmt) => self
                .db
                .set(&stmt.key, Bytes::from(stmt.value), stmt.ttl)
                .map(|()| Response::Success),
            Statement::Get(stmt) => stmt
                .keys
                .iter()
                .map(|key| self.db.get(key))
                .collect::<Result<Vec<_>, _>>()
                .map(Response::Values),
            Statement::Delete(stmt) => self.delete_keys(&stmt.keys).map(|removed| {
                debug!(requested = stmt.keys.len(), removed = removed, "Deleted keys");
                Response::Success
            }),
            Statement::Auth(stmt) => {
                if self.db.authenticate(&stmt.username, &stmt.password) {
                    Ok(Response::Authenticated)
                } else {
                    Ok(Response::InvalidCredentials)
                }
            }
        };

        result.unwrap_or_else(|denied| Response::error(denied.to_string()))
    }

    /// Removes `keys` in order, stopping at the first denial.
    fn delete_keys(&self, keys: &[String]) -> Result<usize, AccessDenied> {
        let mut removed = 0;
        for key in keys {
            if self.db.delete(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

async fn write_line<W>(out: &mut W, response: &Response) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(&response.serialize()).await?;
    out.flush().await
}
