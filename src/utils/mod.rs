//! This module aggregates various utility submodules used throughout the application.

/// Loading of credentials and bot settings from disk.
pub mod config;
