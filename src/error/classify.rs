//! Multi-stage classification pipeline.
//!
//! A [`Decision`] is recomputed on every call and never persisted. The
//! pipeline runs five stages in a fixed order, and later stages overwrite
//! fields set by earlier ones:
//!
//! 1. base lookup table keyed by kind
//! 2. context-aware adjustment from the structured details payload
//! 3. ordered message-pattern rules (only when no structured details exist)
//! 4. correlation against recent history (repeat and cascade detection)
//! 5. finalization, which enforces the retry invariants

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use regex::Regex;

use super::history::ErrorHistory;
use super::record::{ErrorKind, ErrorRecord, Severity};

/// Trailing window used to correlate repeated failures of one kind.
const CORRELATION_WINDOW_SECS: i64 = 60;
/// Repeats of one kind inside the window that trigger escalation.
const CORRELATION_THRESHOLD: usize = 3;
/// Distinct kinds among the most recent entries that signal a cascade.
const CASCADE_DISTINCT_KINDS: usize = 3;
/// Upper bound applied when correlation doubles the retry delay.
const CORRELATION_DELAY_CAP: Duration = Duration::from_millis(10_000);

/// How the caller should space its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryStrategy {
    /// No retry.
    None,
    /// Fixed delay between attempts.
    Retry,
    /// Delay doubles with each attempt.
    RetryWithBackoff,
    /// Delay doubles with each attempt, plus random jitter.
    RetryWithExponentialBackoff,
}

impl RecoveryStrategy {
    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStrategy::None => "NONE",
            RecoveryStrategy::Retry => "RETRY",
            RecoveryStrategy::RetryWithBackoff => "RETRY_WITH_BACKOFF",
            RecoveryStrategy::RetryWithExponentialBackoff => "RETRY_WITH_EXPONENTIAL_BACKOFF",
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The handling decision for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Classified kind; may differ from the record's.
    pub kind: ErrorKind,
    /// Classified severity; may be escalated above the record's.
    pub severity: Severity,
    /// Whether the handler should attempt recovery.
    pub recoverable: bool,
    /// How retries should be spaced.
    pub strategy: RecoveryStrategy,
    /// Whether the caller may retry at all.
    pub retryable: bool,
    /// Retry budget for this failure.
    pub max_retries: u32,
    /// Base delay before the next attempt.
    pub retry_delay: Duration,
    /// Guidance for the operator.
    pub user_action: String,
}

/// One entry in the ordered message-rule table. First match wins, so the
/// position in the table is the precedence.
struct MessageRule {
    pattern: Regex,
    kind: ErrorKind,
    strategy: RecoveryStrategy,
    severity: Option<Severity>,
    recoverable: bool,
    retry_delay: Option<Duration>,
}

/// The classification engine.
#[derive(Debug)]
pub struct Classifier {
    global_max_retries: u32,
    min_retry_delay: Duration,
    rules: Vec<MessageRule>,
}

impl fmt::Debug for MessageRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRule")
            .field("pattern", &self.pattern.as_str())
            .field("kind", &self.kind)
            .finish()
    }
}

impl Classifier {
    /// Creates a classifier. `global_max_retries` caps every retry budget;
    /// `min_retry_delay` is the floor applied to retryable decisions.
    pub fn new(global_max_retries: u32, min_retry_delay: Duration) -> Self {
        Self {
            global_max_retries,
            min_retry_delay,
            rules: Self::message_rules(),
        }
    }

    /// The ordered message-rule table: network, docker, registry, filesystem,
    /// security, config. A message matching several categories gets the
    /// earliest one.
    fn message_rules() -> Vec<MessageRule> {
        fn rule(
            pattern: &str,
            kind: ErrorKind,
            strategy: RecoveryStrategy,
            severity: Option<Severity>,
            recoverable: bool,
            retry_delay: Option<Duration>,
        ) -> MessageRule {
            MessageRule {
                pattern: Regex::new(pattern).expect("invalid message rule pattern"),
                kind,
                strategy,
                severity,
                recoverable,
                retry_delay,
            }
        }

        vec![
            rule(
                r"(?i)(timed?\s*out|connection\s*refused|unreachable)",
                ErrorKind::Network,
                RecoveryStrategy::RetryWithBackoff,
                None,
                true,
                Some(Duration::from_millis(3000)),
            ),
            rule(
                r"(?i)(docker\s*daemon|not\s*running|permission\s*denied)",
                ErrorKind::Docker,
                RecoveryStrategy::Retry,
                None,
                true,
                None,
            ),
            rule(
                r"(?i)(unauthorized|forbidden|rate[\s\-]?limit|registry)",
                ErrorKind::Registry,
                RecoveryStrategy::RetryWithExponentialBackoff,
                None,
                true,
                None,
            ),
            rule(
                r"(?i)(no\s*space|disk\s*full|quota)",
                ErrorKind::FileWrite,
                RecoveryStrategy::None,
                Some(Severity::High),
                false,
                None,
            ),
            rule(
                r"(?i)(vulnerabilit|insecure|malicious)",
                ErrorKind::Security,
                RecoveryStrategy::None,
                Some(Severity::High),
                false,
                None,
            ),
            rule(
                r"(?i)(invalid\s*config|missing\s*required|syntax\s*error)",
                ErrorKind::ConfigLoad,
                RecoveryStrategy::None,
                None,
                false,
                None,
            ),
        ]
    }

    /// Runs the full pipeline against a record and the current history.
    ///
    /// The record is expected to already be in the history; the correlation
    /// stage counts it toward its own repeat window.
    pub fn classify(&self, record: &ErrorRecord, history: &ErrorHistory) -> Decision {
        let mut decision = self.base(record);
        self.adjust_from_details(record, &mut decision);
        self.apply_message_rules(record, &mut decision);
        self.correlate(record, history, &mut decision);
        self.finalize(&mut decision);
        decision
    }

    /// The decision used when classification is disabled: the record's own
    /// kind and severity, never recoverable.
    pub fn degraded(record: &ErrorRecord) -> Decision {
        Decision {
            kind: record.kind,
            severity: record.severity,
            recoverable: false,
            strategy: RecoveryStrategy::None,
            retryable: false,
            max_retries: 0,
            retry_delay: Duration::ZERO,
            user_action: "Review the error message and logs.".to_string(),
        }
    }

    /// Stage 1: fixed defaults per kind. SECURITY and UNKNOWN always leave
    /// this stage at HIGH severity no matter what the record carried.
    fn base(&self, record: &ErrorRecord) -> Decision {
        let (recoverable, strategy, max_retries, delay_ms, user_action): (
            bool,
            RecoveryStrategy,
            u32,
            u64,
            &str,
        ) = match record.kind {
            ErrorKind::Network => (
                true,
                RecoveryStrategy::Retry,
                3,
                2000,
                "Check network connectivity, then retry.",
            ),
            ErrorKind::Registry => (
                true,
                RecoveryStrategy::RetryWithBackoff,
                5,
                1000,
                "Verify registry credentials and availability.",
            ),
            ErrorKind::Docker => (
                true,
                RecoveryStrategy::Retry,
                2,
                3000,
                "Make sure the Docker daemon is running and reachable.",
            ),
            ErrorKind::ConfigLoad => (
                false,
                RecoveryStrategy::None,
                0,
                0,
                "Fix the configuration file before running again.",
            ),
            ErrorKind::Validation => (
                false,
                RecoveryStrategy::None,
                0,
                0,
                "Correct the invalid values reported above.",
            ),
            ErrorKind::Security => (
                false,
                RecoveryStrategy::None,
                0,
                0,
                "Review the security finding; do not publish this image.",
            ),
            ErrorKind::Template => (
                false,
                RecoveryStrategy::None,
                0,
                0,
                "Fix the Dockerfile template before regenerating.",
            ),
            ErrorKind::FileWrite => (
                true,
                RecoveryStrategy::Retry,
                2,
                1000,
                "Check file permissions and available disk space.",
            ),
            ErrorKind::Build => (
                true,
                RecoveryStrategy::Retry,
                1,
                5000,
                "Inspect the build output for the failing step.",
            ),
            ErrorKind::Manifest => (
                true,
                RecoveryStrategy::Retry,
                2,
                2000,
                "Verify all platform images exist before creating the manifest.",
            ),
            ErrorKind::Argument => (
                false,
                RecoveryStrategy::None,
                0,
                0,
                "Run with --help and correct the arguments.",
            ),
            ErrorKind::Test => (
                false,
                RecoveryStrategy::None,
                0,
                0,
                "Inspect the test output; the image is not ready to publish.",
            ),
            ErrorKind::Unknown => (
                false,
                RecoveryStrategy::None,
                0,
                0,
                "Review the error message and logs.",
            ),
        };

        let severity = match record.kind {
            ErrorKind::Security | ErrorKind::Unknown => Severity::High,
            _ => record.severity,
        };

        let max_retries = if recoverable {
            max_retries.min(self.global_max_retries)
        } else {
            max_retries
        };

        Decision {
            kind: record.kind,
            severity,
            recoverable,
            strategy,
            retryable: recoverable,
            max_retries,
            retry_delay: Duration::from_millis(delay_ms),
            user_action: user_action.to_string(),
        }
    }

    /// Stage 2: adjustments driven by the structured details payload, plus
    /// severity keywords in the message.
    fn adjust_from_details(&self, record: &ErrorRecord, decision: &mut Decision) {
        let details = &record.details;

        if let Some(status) = details.status_code {
            if status == 429 {
                decision.recoverable = true;
                decision.retryable = true;
                decision.strategy = RecoveryStrategy::RetryWithExponentialBackoff;
                decision.retry_delay = Duration::from_millis(5000);
            } else if status >= 500 {
                decision.recoverable = true;
                decision.retryable = true;
                decision.strategy = RecoveryStrategy::RetryWithBackoff;
            } else if (400..500).contains(&status) {
                decision.recoverable = false;
                decision.retryable = false;
                decision.strategy = RecoveryStrategy::None;
            }
        }

        match details.code.as_deref() {
            Some("ECONNREFUSED") | Some("ENOTFOUND") => {
                decision.kind = ErrorKind::Network;
                decision.recoverable = true;
                decision.retryable = true;
            }
            Some("EACCES") => {
                decision.kind = ErrorKind::FileWrite;
                decision.severity = Severity::Medium;
            }
            Some("ENOSPC") => {
                decision.kind = ErrorKind::FileWrite;
                decision.severity = Severity::High;
                decision.recoverable = false;
                decision.retryable = false;
                decision.strategy = RecoveryStrategy::None;
            }
            _ => {}
        }

        if let Some(path) = &details.path {
            let path = path.to_ascii_lowercase();
            if path.contains("config") {
                decision.kind = ErrorKind::ConfigLoad;
            } else if path.contains("template") || path.ends_with(".tmpl") {
                decision.kind = ErrorKind::Template;
            }
        }

        if let Some(operation) = &details.operation {
            let operation = operation.to_ascii_lowercase();
            if operation.contains("build") {
                decision.kind = ErrorKind::Build;
            } else if operation.contains("push") || operation.contains("pull") {
                decision.kind = ErrorKind::Registry;
            } else if operation.contains("manifest") {
                decision.kind = ErrorKind::Manifest;
            }
        }

        // Message keywords adjust severity independently of the details.
        let message = record.message.to_ascii_lowercase();
        if ["critical", "fatal", "emergency"]
            .iter()
            .any(|w| message.contains(w))
        {
            decision.severity = Severity::Critical;
        } else if ["warning", "deprecated", "notice"]
            .iter()
            .any(|w| message.contains(w))
        {
            decision.severity = Severity::Low;
        }
    }

    /// Stage 3: the ordered message-rule table, applied only when the record
    /// carries no structured details to key off.
    fn apply_message_rules(&self, record: &ErrorRecord, decision: &mut Decision) {
        if record.details.has_structured_fields() {
            return;
        }

        for rule in &self.rules {
            if rule.pattern.is_match(&record.message) {
                decision.kind = rule.kind;
                decision.strategy = rule.strategy;
                decision.recoverable = rule.recoverable;
                decision.retryable = rule.recoverable;
                if let Some(severity) = rule.severity {
                    decision.severity = severity;
                }
                if let Some(delay) = rule.retry_delay {
                    decision.retry_delay = delay;
                }
                return;
            }
        }
    }

    /// Stage 4: correlation against recent history. Repeated failures of the
    /// same kind escalate severity and shrink the retry budget; a burst of
    /// distinct kinds is treated as a cascade and shuts recovery off.
    fn correlate(&self, record: &ErrorRecord, history: &ErrorHistory, decision: &mut Decision) {
        let window = chrono::Duration::seconds(CORRELATION_WINDOW_SECS);
        let similar = history.recent_of_kind(record.kind, window).len();
        if similar >= CORRELATION_THRESHOLD {
            decision.severity = decision.severity.escalate();
            if decision.retryable {
                decision.max_retries = decision.max_retries.saturating_sub(1).max(1);
                decision.retry_delay = (decision.retry_delay * 2).min(CORRELATION_DELAY_CAP);
            }
            decision.user_action.push_str(
                " This failure has repeated within the last minute; look for a persistent cause.",
            );
        }

        let recent = history.recent_kinds(10);
        let tail = &recent[recent.len().saturating_sub(5)..];
        let distinct: HashSet<_> = tail.iter().collect();
        if distinct.len() >= CASCADE_DISTINCT_KINDS {
            decision.severity = Severity::High;
            decision.recoverable = false;
            decision.retryable = false;
            decision.strategy = RecoveryStrategy::None;
            decision.user_action = "Several different failure kinds occurred in quick \
                succession, which suggests a cascading failure. Stop and inspect the \
                environment before retrying anything."
                .to_string();
        }
    }

    /// Stage 5: consistency enforcement.
    fn finalize(&self, decision: &mut Decision) {
        if self.global_max_retries == 0 {
            decision.recoverable = false;
            decision.retryable = false;
            decision.strategy = RecoveryStrategy::None;
            decision.max_retries = 0;
            return;
        }

        if decision.recoverable {
            decision.retryable = true;
        }
        if decision.retryable {
            decision.max_retries = decision.max_retries.clamp(1, self.global_max_retries);
            if decision.retry_delay < self.min_retry_delay {
                decision.retry_delay = self.min_retry_delay;
            }
            if decision.strategy == RecoveryStrategy::None {
                decision.strategy = RecoveryStrategy::Retry;
            }
        }
    }
}
