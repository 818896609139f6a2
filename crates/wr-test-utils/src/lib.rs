//! # Waiting Room Test Utilities
//!
//! Shared mocks and fixtures for testing the admission library without a
//! real session backend or layout.
//!
//! ## Modules
//!
//! - `mock_backend` - Scriptable [`AdmissionBackend`] and per-user transport
//! - `mock_layout` - Panel layout that counts close requests
//! - `fixtures` - Pending user and queue builders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wr_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let backend = MockAdmissionBackend::builder()
//!         .fail_policy_updates()
//!         .build();
//!
//!     let queues = QueuesBuilder::new()
//!         .authenticated(2)
//!         .guests(3)
//!         .build();
//!
//!     // Run your test...
//! }
//! ```
//!
//! [`AdmissionBackend`]: waiting_room::AdmissionBackend

pub mod fixtures;
pub mod mock_backend;
pub mod mock_layout;

pub use fixtures::*;
pub use mock_backend::*;
pub use mock_layout::*;
