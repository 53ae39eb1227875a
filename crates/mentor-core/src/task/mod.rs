//! Task domain module.
//!
//! Tasks live on a three-column board (`todo`, `in-progress`, `done`).
//!
//! # Module Structure
//!
//! - `model`: `Task`, its status/priority enums, and create/update payloads

mod model;

pub use model::{NewTask, Task, TaskPriority, TaskStatus, TaskType, TaskUpdate};
