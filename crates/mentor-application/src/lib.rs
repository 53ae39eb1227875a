//! Application layer for InsideMentor.
//!
//! - [`ai`]: the AI gateway (prompts, cache, rate gate, retries, fallbacks)
//! - [`wellness_usecase`]: check-in, journaling, mentor chat and report flows
//! - [`analytics`]: the per-user analytics snapshot
//! - [`bootstrap`]: wiring from configuration
//! - [`telemetry`]: tracing setup

pub mod ai;
pub mod analytics;
pub mod bootstrap;
pub mod telemetry;
pub mod wellness_usecase;

pub use ai::{AiGateway, ResiliencePolicy};
pub use bootstrap::MentorApp;
pub use telemetry::{GatewayEvent, init_tracing};
pub use wellness_usecase::{MentorExchange, MoodCheckIn, WellnessStatus, WellnessUseCase};
