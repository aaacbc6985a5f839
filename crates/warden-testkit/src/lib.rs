//! Warden Testing Infrastructure
//!
//! Shared fixtures and proptest strategies for the Warden crates.
//!
//! Add this to a crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! warden-testkit = { path = "../warden-testkit" }
//! ```
//!
//! Then in integration tests:
//! ```rust,ignore
//! use warden_testkit::*;
//!
//! #[test]
//! fn my_test() {
//!     init_tracing();
//!     let ops = memory_operations();
//!     let name = ops.new_project().create().unwrap();
//! }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(missing_docs)]

pub mod fixtures;
pub mod strategies;

pub use fixtures::*;

use tracing_subscriber::EnvFilter;

/// Install a test-friendly `tracing` subscriber once per process.
///
/// Honours `RUST_LOG`; defaults to `warn`. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
