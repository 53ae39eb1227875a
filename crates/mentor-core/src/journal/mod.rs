//! Journal domain module.
//!
//! A journal entry is written once, then optionally receives AI feedback.

mod model;

pub use model::{JournalCategory, JournalEntry, JournalUpdate, NewJournalEntry};
