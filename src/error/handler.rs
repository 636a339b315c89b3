//! The error handler facade.
//!
//! `handle` runs the whole pipeline: normalize the raised failure, record it,
//! classify it, report it, then either recover (swallow) or rethrow the
//! normalized record. The handler owns its collaborators; there is no shared
//! default instance.

use std::collections::HashMap;
use std::time::Duration;

use super::classify::{Classifier, Decision};
use super::history::{ErrorHistory, ErrorStatistics};
use super::record::{ErrorRecord, Failure};
use super::recovery::RecoveryExecutor;
use super::report::{ConsoleSink, DiagnosticSink, MessageFormatter};

/// Constructor-time settings for the handler.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Global cap on any decision's retry budget. Zero disables retries
    /// entirely.
    pub max_retries: u32,
    /// Floor applied to every retryable decision's delay.
    pub retry_delay: Duration,
    /// Bound on the error history.
    pub max_error_history: usize,
    /// Whether recoverable failures trigger a recovery delay.
    pub enable_recovery: bool,
    /// Whether the classification pipeline runs at all.
    pub enable_classification: bool,
    /// Whether diagnostic reports are rendered and emitted.
    pub enable_user_friendly_messages: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            max_error_history: 100,
            enable_recovery: true,
            enable_classification: true,
            enable_user_friendly_messages: true,
        }
    }
}

impl HandlerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global retry cap.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the retry delay floor.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sets the history bound.
    pub fn with_max_error_history(mut self, max_error_history: usize) -> Self {
        self.max_error_history = max_error_history;
        self
    }

    /// Enables or disables recovery.
    pub fn with_recovery(mut self, enabled: bool) -> Self {
        self.enable_recovery = enabled;
        self
    }

    /// Enables or disables classification.
    pub fn with_classification(mut self, enabled: bool) -> Self {
        self.enable_classification = enabled;
        self
    }

    /// Enables or disables diagnostic reports.
    pub fn with_user_friendly_messages(mut self, enabled: bool) -> Self {
        self.enable_user_friendly_messages = enabled;
        self
    }
}

/// Orchestrates normalize → record → classify → report → recover-or-rethrow.
///
/// The handler assumes one logical caller issuing `handle` calls
/// sequentially; it holds plain mutable state and provides no internal
/// locking.
pub struct ErrorHandler {
    config: HandlerConfig,
    classifier: Classifier,
    history: ErrorHistory,
    recovery: RecoveryExecutor,
    formatter: MessageFormatter,
    sink: Box<dyn DiagnosticSink>,
}

impl ErrorHandler {
    /// Creates a handler that reports to stderr.
    pub fn new(config: HandlerConfig) -> Self {
        let classifier = Classifier::new(config.max_retries, config.retry_delay);
        let history = ErrorHistory::new(config.max_error_history);
        Self {
            config,
            classifier,
            history,
            recovery: RecoveryExecutor::new(),
            formatter: MessageFormatter::new(),
            sink: Box::new(ConsoleSink),
        }
    }

    /// Replaces the diagnostic sink.
    pub fn with_sink(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the message formatter.
    pub fn with_formatter(mut self, formatter: MessageFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Handles a raised failure.
    ///
    /// Returns `Ok(())` when recovery succeeded, meaning the computed delay
    /// elapsed and the caller may retry its own call. Returns the normalized
    /// record as the error otherwise; when diagnostics are enabled the report
    /// has already been emitted by then.
    pub async fn handle(
        &mut self,
        failure: impl Into<Failure>,
        context: Option<HashMap<String, String>>,
    ) -> Result<(), ErrorRecord> {
        let record = failure.into().normalize(context);
        self.history.push(record.clone());

        let decision = if self.config.enable_classification {
            self.classifier.classify(&record, &self.history)
        } else {
            Classifier::degraded(&record)
        };

        tracing::debug!(
            kind = %decision.kind,
            severity = %decision.severity,
            recoverable = decision.recoverable,
            strategy = %decision.strategy,
            "classified failure"
        );

        if self.config.enable_user_friendly_messages {
            let report = self.formatter.render(&record, &decision);
            self.sink.emit(&report);
        }

        if self.config.enable_recovery && decision.recoverable {
            let key = record.identity_key();
            if self.recovery.attempt(&decision, &key).await {
                tracing::info!(kind = %decision.kind, "recovery delay elapsed; caller may retry");
                return Ok(());
            }
        }

        Err(record)
    }

    /// Classifies a failure without recording or recovering. Useful for
    /// callers that only need the decision.
    pub fn classify(&self, record: &ErrorRecord) -> Decision {
        if self.config.enable_classification {
            self.classifier.classify(record, &self.history)
        } else {
            Classifier::degraded(record)
        }
    }

    /// Ordered snapshot of the history, oldest first.
    pub fn history(&self) -> Vec<ErrorRecord> {
        self.history.snapshot()
    }

    /// Empties the history and all retry bookkeeping.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.recovery.clear();
    }

    /// Aggregate counts over the recorded failures.
    pub fn statistics(&self) -> ErrorStatistics {
        self.history.statistics()
    }

    /// The active configuration.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }
}
