//! Domain commands.
//!
//! Every command here is a placeholder for the eventual build/publish
//! pipeline: preconditions are checked for real, the operation itself logs a
//! "not yet implemented" notice. Failures are returned as [`ErrorRecord`]s
//! (crate::error::ErrorRecord) so the caller can route them through the
//! error handler with a context map built by [`context_map`].

pub mod build;
pub mod generate;
pub mod manifest;
pub mod push;
pub mod test;

use std::collections::HashMap;

use crate::config::ToolConfig;

/// Builds the flat context map handed to the error handler alongside a
/// failure from `operation`.
pub fn context_map(operation: &str, config: &ToolConfig) -> HashMap<String, String> {
    let mut context = HashMap::new();
    context.insert("operation".to_string(), operation.to_string());
    context.insert("image".to_string(), config.image_reference());
    if let Some(registry) = &config.registry {
        context.insert("registry".to_string(), registry.clone());
    }
    context
}
