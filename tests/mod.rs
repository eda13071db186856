//! Test suite for the Subsonic music bot
//! Drives the music core through fake backends, a recording sink and mocked voice

pub mod common;
pub mod integration;

// Re-export commonly used testing utilities
pub use assert_matches::assert_matches;
pub use pretty_assertions::{assert_eq, assert_ne};
pub use rstest::*;
pub use test_case::test_case;

/// Common test setup and utilities
pub mod test_utils {
    use std::sync::Once;
    use tracing::Level;

    static INIT: Once = Once::new();

    /// Initialize test environment
    pub fn init() {
        INIT.call_once(|| {
            // Initialize tracing for tests
            tracing_subscriber::fmt()
                .with_max_level(Level::DEBUG)
                .with_test_writer()
                .init();
        });
    }
}
