//! Mentor chat domain module.
//!
//! # Module Structure
//!
//! - `model`: `ChatMessage` (append-only, ordered oldest first) and
//!   `ChatSession` (running counters plus an informational active flag)

mod model;

pub use model::{
    ChatMessage, ChatRole, ChatSession, ChatSessionUpdate, DEFAULT_SESSION_TITLE, NewChatMessage,
    NewChatSession,
};
