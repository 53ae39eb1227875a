//! Progress reporting domain module.
//!
//! # Module Structure
//!
//! - `model`: generated insight payloads (`ProgressInsights`, `WeeklyInsights`),
//!   their archived forms (`ProgressReport`, `WeeklyReport`) and the
//!   per-user `UserAnalytics` snapshot

mod model;

pub use model::{ProgressInsights, ProgressReport, UserAnalytics, WeeklyInsights, WeeklyReport};
