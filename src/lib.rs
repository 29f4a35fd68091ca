//! # RQLDB - An In-Memory Key-Value Database with a Statement Language
//!
//! RQLDB is an in-memory key-value database driven by RQL, a small
//! `;`-terminated statement language. Keys can carry a time-to-live, and each
//! client connection has its own authentication session.
//!
//! ## Features
//!
//! - **RQL**: `SET`, `GET`, `DEL` and `AUTH` statements, several per request
//! - **Concurrent**: Sharded storage with RwLock for concurrent access
//! - **TTL Support**: Keys can expire, checked on read and swept in the background
//! - **Sessions**: Per-connection authentication against a user store
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               RQLDB                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│   Driver    │                  │
//! │  │ (Listener)  │    │  Handler    │    │ (lex/parse) │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │                     ┌──────────────────────────────────────────────┐   │
//! │                     │        Session (one per connection)          │   │
//! │                     └──────────┬───────────────────────┬───────────┘   │
//! │                                │                       │               │
//! │                                ▼                       ▼               │
//! │                     ┌─────────────────────┐ ┌─────────────────────┐    │
//! │                     │ StorageEngine<Bytes>│ │StorageEngine<User>  │    │
//! │                     │  64 RwLock shards   │ │  64 RwLock shards   │    │
//! │                     └─────────────────────┘ └─────────────────────┘    │
//! │                                ▲                                        │
//! │                     ┌──────────┴──────────────────────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use rqldb::connection::{handle_connection, ConnectionStats};
//! use rqldb::security::{register_user, AccessLevel, RegisteredUser, Session};
//! use rqldb::storage::{start_expiry_sweeper, Expiry, StorageEngine};
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let data: Arc<StorageEngine<Bytes>> = Arc::new(StorageEngine::new(Expiry::Never));
//!     let users: Arc<StorageEngine<RegisteredUser>> = Arc::new(StorageEngine::new(Expiry::Never));
//!     register_user(&users, "admin", "s3cret", AccessLevel::Admin);
//!
//!     let _sweeper = start_expiry_sweeper("data", Arc::clone(&data));
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:5678").await?;
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         let session = Session::new(Arc::clone(&data), Arc::clone(&users));
//!         tokio::spawn(handle_connection(stream, addr, session, Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Statements
//!
//! | Statement                 | Response                                        |
//! |---------------------------|-------------------------------------------------|
//! | `SET key value [ttl_ms];` | `Success`                                       |
//! | `GET key [key ...];`      | `["v1", (nil), ...]`                            |
//! | `DEL key [key ...];`      | `Success`                                       |
//! | `AUTH user password;`     | `Successfully authenticated` or `Invalid Credentials` |
//!
//! A request that fails to lex or parse gets a single `ERROR: <message>` line
//! and none of its statements run.
//!
//! ## Module Overview
//!
//! - [`protocol`]: RQL lexer, parser and statement/response types
//! - [`storage`]: Thread-safe storage engine with TTL support
//! - [`security`]: Registered users and per-connection sessions
//! - [`commands`]: The driver that executes statements
//! - [`connection`]: Client connection management
//!
//! ## Lazy + Active Expiry
//!
//! Keys with TTL are expired in two ways:
//! 1. **Lazy**: When a key is accessed, we check if it's expired
//! 2. **Active**: A background task periodically scans for expired keys

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod security;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{Database, Driver};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse, Ast, ParseError, Response, Statement};
pub use security::{register_user, AccessLevel, RegisteredUser, Session};
pub use storage::{start_expiry_sweeper, Expiry, ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port RQLDB listens on
pub const DEFAULT_PORT: u16 = 5678;

/// The default host RQLDB binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of RQLDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
