//! Storage Engine Module
//!
//! This module provides the TTL-aware key-value store used by RQLDB for both
//! client data and registered users, plus an optional background sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   StorageEngine<V>                          │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use rqldb::storage::{Expiry, StorageEngine};
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! // Data store: entries live until deleted unless a write says otherwise
//! let engine: Arc<StorageEngine<Bytes>> = Arc::new(StorageEngine::new(Expiry::Never));
//!
//! engine.set(Bytes::from("name"), Bytes::from("widget"), None);
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("widget")));
//!
//! engine.set(Bytes::from("session"), Bytes::from("token123"), Some(Expiry::from_millis(3_600_000)));
//! ```

pub mod engine;
pub mod expiry;

// Re-export commonly used types
pub use engine::{Entry, Expiry, StorageEngine, StorageStats};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};
