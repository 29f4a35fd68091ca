//! Security Module
//!
//! This module sits between the driver and the stores. It keeps the
//! authorization concern apart from storage, so that access policy can
//! change here without touching either side.
//!
//! ```text
//! ┌─────────────────┐
//! │     Driver      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐        ┌──────────────────────────────┐
//! │    Session      │───────>│ StorageEngine<RegisteredUser>│
//! │ (per connection)│        └──────────────────────────────┘
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │StorageEngine<B> │
//! └─────────────────┘
//! ```

pub mod session;
pub mod user;

pub use session::{Identity, Session};
pub use user::{register_user, AccessDenied, AccessLevel, Operation, PasswordDigest, RegisteredUser};
