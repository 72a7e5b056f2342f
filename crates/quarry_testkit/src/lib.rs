//! # Quarry Testkit
//!
//! Test utilities for Quarry.
//!
//! This crate provides:
//! - Managers and indices in temporary directories that clean up on drop
//! - Sample document sets for search scenarios
//! - Property-based document generators using proptest
//! - One-time tracing setup driven by `RUST_LOG`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quarry_testkit::prelude::*;
//!
//! #[test]
//! fn finds_tech_articles() {
//!     let index = TestIndex::new("articles");
//!     index.add_documents(&sample_documents()).unwrap();
//!     index.refresh().unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::init_tracing;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::init_tracing;
