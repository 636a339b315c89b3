//! Diagnostic rendering collaborators.
//!
//! The formatter turns a record and its decision into human-readable text;
//! the sink receives the rendered text. Both are explicit instances owned by
//! the handler, constructed at process start and threaded through.

use std::fmt::Write as _;

use owo_colors::OwoColorize;

use super::classify::Decision;
use super::record::{ErrorDetails, ErrorKind, ErrorRecord, Severity};

/// Destination for rendered diagnostics.
pub trait DiagnosticSink: Send + Sync {
    /// Delivers one rendered report.
    fn emit(&self, text: &str);
}

/// Sink that writes reports to stderr, keeping stdout free for command
/// output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn emit(&self, text: &str) {
        eprintln!("{text}");
    }
}

/// Renders user-facing diagnostic reports.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    color: bool,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self { color: true }
    }
}

impl MessageFormatter {
    /// Creates a formatter with color enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables ANSI colors.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// The one-line base message shown for each failure kind.
    pub fn base_message(&self, kind: ErrorKind) -> &'static str {
        match kind {
            ErrorKind::Network => "A network operation failed.",
            ErrorKind::Registry => "The container registry rejected or dropped the request.",
            ErrorKind::Docker => "The Docker daemon could not complete the request.",
            ErrorKind::ConfigLoad => "The tool configuration could not be loaded.",
            ErrorKind::Validation => "The provided input failed validation.",
            ErrorKind::Security => "A security problem was detected.",
            ErrorKind::Template => "The Dockerfile template could not be processed.",
            ErrorKind::FileWrite => "A file could not be written.",
            ErrorKind::Build => "The image build failed.",
            ErrorKind::Manifest => "The multi-arch manifest could not be created.",
            ErrorKind::Argument => "The command arguments are invalid.",
            ErrorKind::Test => "The local image test failed.",
            ErrorKind::Unknown => "An unexpected error occurred.",
        }
    }

    /// Builds the context line from the recognized detail fields, if any are
    /// present.
    pub fn context_line(&self, details: &ErrorDetails) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(operation) = &details.operation {
            parts.push(format!("operation={operation}"));
        }
        if let Some(registry) = &details.registry {
            parts.push(format!("registry={registry}"));
        }
        if let Some(platform) = &details.platform {
            parts.push(format!("platform={platform}"));
        }
        if let Some(architecture) = &details.architecture {
            parts.push(format!("architecture={architecture}"));
        }
        if let Some(path) = &details.path {
            parts.push(format!("path={path}"));
        }
        if let Some(status) = details.status_code {
            parts.push(format!("status={status}"));
        }
        if let Some(code) = &details.code {
            parts.push(format!("code={code}"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Renders the full diagnostic report for a record and its decision.
    pub fn render(&self, record: &ErrorRecord, decision: &Decision) -> String {
        let mut out = String::new();

        let header = format!("{} [{}]", decision.kind, decision.severity);
        if self.color {
            let colored = match decision.severity {
                Severity::Critical | Severity::High => header.red().bold().to_string(),
                Severity::Medium => header.yellow().bold().to_string(),
                Severity::Low => header.cyan().to_string(),
            };
            let _ = writeln!(out, "{colored}");
        } else {
            let _ = writeln!(out, "{header}");
        }

        let _ = writeln!(out, "  at {}", record.timestamp.to_rfc3339());
        let _ = writeln!(out, "  {}", record.message);
        let _ = writeln!(out, "  {}", self.base_message(decision.kind));

        if let Some(context) = self.context_line(&record.details) {
            let _ = writeln!(out, "  context: {context}");
        }
        if let Some(original) = &record.details.original_error {
            if *original != record.message {
                let _ = writeln!(out, "  caused by: {original}");
            }
        }

        if !record.suggestions.is_empty() {
            let _ = writeln!(out, "  suggestions:");
            for (i, suggestion) in record.suggestions.iter().enumerate() {
                let _ = writeln!(out, "    {}. {suggestion}", i + 1);
            }
        }

        let _ = writeln!(out, "  action required: {}", decision.user_action);

        if decision.recoverable {
            let _ = write!(
                out,
                "  retry: up to {} attempt(s), {}ms base delay ({})",
                decision.max_retries,
                decision.retry_delay.as_millis(),
                decision.strategy
            );
        } else {
            let _ = write!(out, "  not recoverable");
        }

        out
    }
}
