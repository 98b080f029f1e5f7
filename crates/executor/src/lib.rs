pub mod dry_run;
pub mod error;
pub mod mode;
pub mod report;
pub mod runner;
pub mod transaction;

pub use error::{MigrationExecutionError, SequencerError};
pub use mode::{ExecutionMode, LedgerPolicy};
pub use report::{MigrationOutcome, RunReport, RunStatus};
pub use runner::{NoopReporter, Reporter, Sequencer, SequencerOptions};
