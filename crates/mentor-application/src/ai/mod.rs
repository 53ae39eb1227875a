//! AI gateway: prompt rendering, resilient dispatch and typed results.

pub mod cleanup;
pub mod gateway;
pub mod prompts;
pub mod resilience;
pub mod responses;

pub use gateway::{AiGateway, cache_key, digest};
pub use prompts::{JournalSummary, MoodSummary, PromptLibrary, TaskSummary};
pub use resilience::{CacheStats, ResiliencePolicy};
pub use responses::{
    Greeting, JournalFeedback, MENTOR_APOLOGY, MentorContext, MentorReply, MoodInsight, ParsedTask,
    TaskBreakdown, TaskOrder, WeeklyData,
};
