//! Command Execution Module
//!
//! This module runs parsed RQL statements against the database and renders
//! their responses.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RQL Parser     │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Driver      │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Session      │  (security module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Statements
//!
//! - `SET key value [ttl_ms]`
//! - `GET key [key ...]`
//! - `DEL key [key ...]`
//! - `AUTH username password`

pub mod driver;

pub use driver::{Database, Driver};
