//! `build`: produce a hardened image from a build context.

use std::path::Path;

use crate::config::ToolConfig;
use crate::error::{ErrorDetails, ErrorKind, ErrorRecord};

/// Runs the build command against `context_dir`.
///
/// The build itself is not implemented yet; only the precondition checks are
/// real.
pub async fn run(config: &ToolConfig, context_dir: &Path) -> Result<(), ErrorRecord> {
    if !context_dir.is_dir() {
        return Err(ErrorRecord::new(
            ErrorKind::Build,
            format!("build context {} is not a directory", context_dir.display()),
        )
        .with_details(ErrorDetails {
            path: Some(context_dir.display().to_string()),
            operation: Some("build".to_string()),
            ..ErrorDetails::default()
        })
        .with_suggestion("Pass the application directory with --context"));
    }

    tracing::info!(
        image = %config.image_reference(),
        platforms = ?config.platforms,
        non_root = config.hardening.non_root,
        "preparing hardened image build"
    );
    tracing::warn!("image build is not yet implemented");
    Ok(())
}
