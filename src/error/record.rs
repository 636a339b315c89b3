//! Failure taxonomy and the normalized error record.
//!
//! Every failure that enters the handler is normalized into an [`ErrorRecord`]:
//! a single tagged struct with an [`ErrorKind`] discriminant rather than a
//! family of error subtypes. Records are immutable once created.

use std::collections::HashMap;
use std::fmt;
use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed category of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Network connectivity failures (DNS, TCP, TLS).
    Network,
    /// Registry interactions: push, pull, auth, rate limits.
    Registry,
    /// Docker daemon failures.
    Docker,
    /// Tool configuration could not be loaded.
    ConfigLoad,
    /// Input or configuration failed validation.
    Validation,
    /// Security findings: vulnerabilities, insecure settings.
    Security,
    /// Dockerfile template processing failures.
    Template,
    /// Filesystem write failures (permissions, disk space).
    FileWrite,
    /// Image build failures.
    Build,
    /// Multi-arch manifest creation failures.
    Manifest,
    /// Invalid command-line arguments.
    Argument,
    /// Local image test failures.
    Test,
    /// Anything that could not be classified.
    Unknown,
}

impl ErrorKind {
    /// Stable string form, used for statistics keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK",
            ErrorKind::Registry => "REGISTRY",
            ErrorKind::Docker => "DOCKER",
            ErrorKind::ConfigLoad => "CONFIG_LOAD",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Security => "SECURITY",
            ErrorKind::Template => "TEMPLATE",
            ErrorKind::FileWrite => "FILE_WRITE",
            ErrorKind::Build => "BUILD",
            ErrorKind::Manifest => "MANIFEST",
            ErrorKind::Argument => "ARGUMENT",
            ErrorKind::Test => "TEST",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Default severity a record of this kind carries before classification.
    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorKind::ConfigLoad | ErrorKind::Build => Severity::High,
            ErrorKind::Security | ErrorKind::Unknown => Severity::High,
            ErrorKind::Argument => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a failure, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// One level up, capped at `Critical`.
    pub fn escalate(self) -> Severity {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload attached to a record.
///
/// Recognized fields are typed; anything else the caller supplied travels in
/// the flat `context` map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// HTTP-like status code from a registry or daemon response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// System error code, e.g. `ECONNREFUSED`, `EACCES`, `ENOSPC`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Filesystem path involved in the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// The operation that was running, e.g. `build`, `push`, `manifest`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Registry host, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Target CPU architecture, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    /// Target platform string, when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Display form of the original, unnormalized failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_error: Option<String>,
    /// Flat context map supplied by the caller.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
}

impl ErrorDetails {
    /// True when no field is set and the context map is empty.
    pub fn is_empty(&self) -> bool {
        self.status_code.is_none()
            && self.code.is_none()
            && self.path.is_none()
            && self.operation.is_none()
            && self.registry.is_none()
            && self.architecture.is_none()
            && self.platform.is_none()
            && self.original_error.is_none()
            && self.context.is_empty()
    }

    /// True when any field the classifier keys off is present.
    ///
    /// Message-pattern classification only runs when this is false.
    pub fn has_structured_fields(&self) -> bool {
        self.status_code.is_some()
            || self.code.is_some()
            || self.path.is_some()
            || self.operation.is_some()
    }
}

/// A normalized failure. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// The failure category.
    pub kind: ErrorKind,
    /// Severity the failure arrived with.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Structured payload.
    #[serde(default)]
    pub details: ErrorDetails,
    /// Ordered remediation hints.
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Optional short machine code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    /// Creates a record with the kind's default severity and a current timestamp.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            details: ErrorDetails::default(),
            suggestions: Vec::new(),
            code: None,
            timestamp: Utc::now(),
        }
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Attaches a structured payload.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Appends a remediation hint.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Sets the machine code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Overrides the timestamp. Mostly useful in tests that need to backdate
    /// records for window queries.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Deterministic key for retry bookkeeping, derived from
    /// `(kind, message, timestamp)`. Not a deduplication key.
    pub fn identity_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.message.as_bytes());
        hasher.update(b"|");
        hasher.update(self.timestamp.timestamp_millis().to_be_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorRecord {}

/// A failure raised into the handler, before normalization.
///
/// Callers that already classified their failure pass an [`ErrorRecord`];
/// everything else arrives as an I/O error or a plain message and is wrapped.
#[derive(Debug)]
pub enum Failure {
    /// A pre-classified record, used as-is.
    Record(ErrorRecord),
    /// A raw I/O error.
    Io(io::Error),
    /// A bare message.
    Message(String),
}

impl From<ErrorRecord> for Failure {
    fn from(record: ErrorRecord) -> Self {
        Failure::Record(record)
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        Failure::Io(err)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Message(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::Message(message.to_string())
    }
}

impl Failure {
    /// Normalizes the raised value into an [`ErrorRecord`].
    ///
    /// Pre-classified records pass through unchanged. Anything else is wrapped
    /// as `UNKNOWN`/`MEDIUM` with the original failure and the caller's
    /// context captured in the details payload.
    pub fn normalize(self, context: Option<HashMap<String, String>>) -> ErrorRecord {
        match self {
            Failure::Record(record) => record,
            Failure::Io(err) => {
                let details = ErrorDetails {
                    code: io_code(&err).map(String::from),
                    original_error: Some(err.to_string()),
                    context: context.unwrap_or_default(),
                    ..ErrorDetails::default()
                };
                ErrorRecord::new(ErrorKind::Unknown, err.to_string())
                    .with_severity(Severity::Medium)
                    .with_details(details)
            }
            Failure::Message(message) => {
                let details = ErrorDetails {
                    original_error: Some(message.clone()),
                    context: context.unwrap_or_default(),
                    ..ErrorDetails::default()
                };
                ErrorRecord::new(ErrorKind::Unknown, message)
                    .with_severity(Severity::Medium)
                    .with_details(details)
            }
        }
    }
}

/// Maps an I/O error kind to the system code string the classifier recognizes.
fn io_code(err: &io::Error) -> Option<&'static str> {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::PermissionDenied => Some("EACCES"),
        io::ErrorKind::NotFound => Some("ENOENT"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_as_str() {
        assert_eq!(ErrorKind::ConfigLoad.as_str(), "CONFIG_LOAD");
        assert_eq!(ErrorKind::FileWrite.to_string(), "FILE_WRITE");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_escalate_caps_at_critical() {
        assert_eq!(Severity::Low.escalate(), Severity::Medium);
        assert_eq!(Severity::Medium.escalate(), Severity::High);
        assert_eq!(Severity::High.escalate(), Severity::Critical);
        assert_eq!(Severity::Critical.escalate(), Severity::Critical);
    }

    #[test]
    fn test_default_severities() {
        assert_eq!(ErrorKind::Network.default_severity(), Severity::Medium);
        assert_eq!(ErrorKind::Security.default_severity(), Severity::High);
        assert_eq!(ErrorKind::Unknown.default_severity(), Severity::High);
        assert_eq!(ErrorKind::Argument.default_severity(), Severity::Low);
    }

    #[test]
    fn test_record_builder() {
        let record = ErrorRecord::new(ErrorKind::Registry, "push rejected")
            .with_severity(Severity::High)
            .with_code("E_PUSH")
            .with_suggestion("Check registry credentials");

        assert_eq!(record.kind, ErrorKind::Registry);
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.code.as_deref(), Some("E_PUSH"));
        assert_eq!(record.suggestions.len(), 1);
        assert_eq!(record.to_string(), "push rejected");
    }

    #[test]
    fn test_identity_key_is_deterministic() {
        let record = ErrorRecord::new(ErrorKind::Network, "connection refused");
        let clone = record.clone();
        assert_eq!(record.identity_key(), clone.identity_key());
        assert_eq!(record.identity_key().len(), 16);
    }

    #[test]
    fn test_identity_key_differs_by_message() {
        let ts = Utc::now();
        let a = ErrorRecord::new(ErrorKind::Network, "refused").with_timestamp(ts);
        let b = ErrorRecord::new(ErrorKind::Network, "reset").with_timestamp(ts);
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_normalize_passes_records_through() {
        let record = ErrorRecord::new(ErrorKind::Docker, "daemon not running");
        let normalized = Failure::from(record.clone()).normalize(None);
        assert_eq!(normalized, record);
    }

    #[test]
    fn test_normalize_wraps_message_as_unknown() {
        let mut context = HashMap::new();
        context.insert("operation".to_string(), "push".to_string());

        let record = Failure::from("something odd").normalize(Some(context));
        assert_eq!(record.kind, ErrorKind::Unknown);
        assert_eq!(record.severity, Severity::Medium);
        assert_eq!(record.message, "something odd");
        assert_eq!(
            record.details.original_error.as_deref(),
            Some("something odd")
        );
        assert_eq!(
            record.details.context.get("operation").map(String::as_str),
            Some("push")
        );
    }

    #[test]
    fn test_normalize_maps_io_codes() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let record = Failure::from(err).normalize(None);
        assert_eq!(record.kind, ErrorKind::Unknown);
        assert_eq!(record.details.code.as_deref(), Some("ECONNREFUSED"));

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let record = Failure::from(err).normalize(None);
        assert_eq!(record.details.code.as_deref(), Some("EACCES"));
    }

    #[test]
    fn test_details_structured_fields() {
        let mut details = ErrorDetails::default();
        assert!(details.is_empty());
        assert!(!details.has_structured_fields());

        details.original_error = Some("boom".to_string());
        assert!(!details.has_structured_fields());

        details.status_code = Some(500);
        assert!(details.has_structured_fields());
    }
}
