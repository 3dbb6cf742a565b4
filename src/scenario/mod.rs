pub mod check;
pub mod payload;
pub mod steps;
pub mod workload;

pub use check::{Check, StatusExpectation};
pub use payload::{Member, PullRequestPayload, TeamPayload};
pub use workload::ReviewWorkload;
