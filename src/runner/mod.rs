pub mod context;
pub mod executor;
pub mod reporter;
pub mod request;
pub mod types;

pub use context::RunContext;
pub use executor::{CancelFlag, ChainRunner};
pub use reporter::TestReporter;
pub use request::render_request;
pub use types::{AbortReason, ChainOutcome, ChainRunResult, ChainSummary, StepOutcome, StepResult};
