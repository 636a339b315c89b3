//! `push`: publish a built image to the configured registry.

use crate::config::ToolConfig;
use crate::error::{ErrorKind, ErrorRecord};

/// Runs the push command.
pub async fn run(config: &ToolConfig) -> Result<(), ErrorRecord> {
    let registry = config.registry.as_deref().ok_or_else(|| {
        ErrorRecord::new(ErrorKind::Validation, "no registry configured")
            .with_suggestion("Set `registry` in shipwright.toml or pass --registry")
    })?;

    tracing::info!(registry, image = %config.image_reference(), "preparing registry push");
    tracing::warn!("registry push is not yet implemented");
    Ok(())
}
