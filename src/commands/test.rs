//! `test`: run a local smoke test against the built image.

use crate::config::ToolConfig;
use crate::error::ErrorRecord;

/// Runs the local test command.
pub async fn run(config: &ToolConfig) -> Result<(), ErrorRecord> {
    tracing::info!(image = %config.image_reference(), "preparing local image test");
    tracing::warn!("local image testing is not yet implemented");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_test_is_placeholder() {
        assert!(run(&ToolConfig::default()).await.is_ok());
    }
}
