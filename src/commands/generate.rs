//! `generate`: write a hardened Dockerfile for the configured runtime.
//!
//! The template engine itself is an external collaborator; this command only
//! validates the destination and reports the placeholder notice.

use std::path::Path;

use crate::config::ToolConfig;
use crate::error::{ErrorDetails, ErrorKind, ErrorRecord};

/// Runs the generate command, targeting `output`.
pub async fn run(config: &ToolConfig, output: &Path) -> Result<(), ErrorRecord> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(ErrorRecord::new(
                ErrorKind::FileWrite,
                format!("output directory {} does not exist", parent.display()),
            )
            .with_details(ErrorDetails {
                path: Some(output.display().to_string()),
                operation: Some("generate".to_string()),
                ..ErrorDetails::default()
            })
            .with_suggestion("Create the directory or pass a different --output"));
        }
    }

    tracing::info!(
        output = %output.display(),
        non_root = config.hardening.non_root,
        read_only_rootfs = config.hardening.read_only_rootfs,
        drop_capabilities = config.hardening.drop_capabilities,
        "preparing Dockerfile generation"
    );
    tracing::warn!("Dockerfile generation is not yet implemented");
    Ok(())
}
