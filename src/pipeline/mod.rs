// src/pipeline/mod.rs
pub mod orchestrator;
pub mod scheduler;

pub use orchestrator::{
    OrchestratorConfig, OrchestratorState, RunOutcome, RunReport, UpdateOrchestrator,
};
pub use scheduler::{spawn_daily_scheduler, DailySchedule};
