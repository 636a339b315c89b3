//! Shipwright - hardened container image builder and publisher.
//!
//! The domain commands (build, push, manifest, test, generate) are
//! placeholders for the eventual pipeline. The part that is fully built is
//! the error classification and recovery engine in [`error`]: every failure
//! raised by a command is normalized, recorded, classified and either waited
//! out or rethrown with a rendered diagnostic.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
