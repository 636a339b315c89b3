//! `manifest`: assemble a multi-arch manifest list for the pushed images.

use crate::config::ToolConfig;
use crate::error::{ErrorKind, ErrorRecord};

/// Runs the manifest command.
pub async fn run(config: &ToolConfig) -> Result<(), ErrorRecord> {
    if config.registry.is_none() {
        return Err(
            ErrorRecord::new(ErrorKind::Validation, "no registry configured")
                .with_suggestion("A manifest list can only be created in a registry"),
        );
    }
    if config.platforms.is_empty() {
        return Err(ErrorRecord::new(
            ErrorKind::Validation,
            "no platforms configured for the manifest",
        )
        .with_suggestion("List target platforms under `platforms` in shipwright.toml"));
    }

    tracing::info!(
        image = %config.image_reference(),
        platforms = ?config.platforms,
        "preparing manifest list"
    );
    tracing::warn!("manifest creation is not yet implemented");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manifest_requires_registry() {
        let record = run(&ToolConfig::default()).await.unwrap_err();
        assert_eq!(record.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_manifest_requires_platforms() {
        let mut config = ToolConfig::default();
        config.registry = Some("registry.example.com".to_string());
        config.platforms.clear();

        let record = run(&config).await.unwrap_err();
        assert_eq!(record.kind, ErrorKind::Validation);
        assert!(record.message.contains("platforms"));
    }
}
