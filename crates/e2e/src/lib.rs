//! Plumbline scenario runtime
//!
//! Everything the BDD runner needs besides the step definitions:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                plumbline run (cucumber)                  │
//! ├──────────────────────────────────────────────────────────┤
//! │  profile    tag filter, concurrency, retries, outputs    │
//! │  lifecycle  per-scenario plan from tags, outcome logging │
//! │  context    last response/error, test data, timers,      │
//! │             assertion helpers                            │
//! ├──────────────────────────────────────────────────────────┤
//! │  report     JSON log → HTML / JUnit / CSV / summary      │
//! │  cleanup    remove generated artifacts                   │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod cleanup;
pub mod context;
pub mod lifecycle;
pub mod profile;
pub mod report;

pub use cleanup::{CleanTarget, Cleaner, CleanupPlan, CleanupStats};
pub use context::ExecutionContext;
pub use lifecycle::{ScenarioOutcome, ScenarioPlan, SkipReason};
pub use profile::{ProfileSet, ResolvedRun, RunOverrides, RunProfile};
pub use report::{ReportGenerator, RunStats};
