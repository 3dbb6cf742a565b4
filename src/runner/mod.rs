pub mod executor;
pub mod metrics;
pub mod reporter;
pub mod schedule;
pub mod types;

pub use executor::{ExecutorOptions, LoadExecutor, Scenario};
pub use metrics::Metrics;
pub use reporter::RunReporter;
pub use schedule::{RampSchedule, Segment};
pub use types::{CheckSummary, IterationId, RequestSummary, RunSummary, TrendSummary};
