//! v1 API Data Transfer Objects.
//!
//! Wire types for the REST API, kept separate from the domain models in
//! `src/models/`.

pub mod chats;
pub mod sessions;

pub use chats::*;
pub use sessions::*;
