//! Domain layer of the InsideMentor gateways.
//!
//! Holds the entity model, the capability traits behind which vendors sit
//! (document store, text completion, identity), configuration types, and the
//! shared error type. Nothing in this crate performs I/O.

pub mod chat;
pub mod completion;
pub mod config;
pub mod entity;
pub mod error;
pub mod identity;
pub mod journal;
pub mod mood;
pub mod payload;
pub mod report;
pub mod store;
pub mod task;
pub mod timestamp;
pub mod user;

// Re-export common error type
pub use error::{MentorError, Result};
