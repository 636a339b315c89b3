//! Error classification and recovery engine.
//!
//! Failures raised anywhere in the tool funnel through [`ErrorHandler`],
//! which normalizes them into records, keeps a bounded history for
//! correlation, classifies each one into a handling decision and either
//! waits out a recovery delay or rethrows.

pub mod classify;
pub mod handler;
pub mod history;
pub mod record;
pub mod recovery;
pub mod report;

pub use classify::{Classifier, Decision, RecoveryStrategy};
pub use handler::{ErrorHandler, HandlerConfig};
pub use history::{ErrorHistory, ErrorStatistics};
pub use record::{ErrorDetails, ErrorKind, ErrorRecord, Failure, Severity};
pub use recovery::RecoveryExecutor;
pub use report::{ConsoleSink, DiagnosticSink, MessageFormatter};
