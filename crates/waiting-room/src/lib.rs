//! Waiting Room Admission Library
//!
//! In-process admission surface for a live session: users wait in two
//! queues (authenticated and guest) until a moderator accepts or denies
//! them.
//!
//! - Decision engine: maps a moderator action and the "remember choice"
//!   toggle to the affected users, the admission status, and an optional
//!   default policy for future arrivals
//! - Admission service: applies a decision and its policy as one
//!   serialized operation, with a compensating revert on total failure
//! - Panel lifecycle: closes the panel once the waiting room is off and
//!   nobody is left waiting
//!
//! # Architecture
//!
//! ```text
//! presence service ──push──▶ RegistryHandle ──watch──▶ RegistryReceiver
//!                                                         │
//!                      ┌──────────────────────────────────┤
//!                      ▼                                  ▼
//!              AdmissionService                    PanelLifecycle
//!              ├── engine::decide (pure)           └── PanelLayout::close_panel
//!              └── AdmissionBackend
//!                  └── PerUserBatchAdapter (optional)
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Pure decision engine and batch action catalog
//! - [`admission`] - Applies decisions against the backend
//! - [`lifecycle`] - Panel auto-close controller
//! - [`registry`] - Pending queues and flags with change notification
//! - [`backend`] - Backend seams and per-user batch adapter
//! - [`sequence`] - Display ordinals
//! - [`view`] - Panel read model
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types with surface error codes
//! - [`observability`] - Tracing setup and metrics

pub mod admission;
pub mod backend;
pub mod config;
pub mod engine;
pub mod errors;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod sequence;
pub mod types;
pub mod view;

pub use admission::{AdmissionReport, AdmissionService, PolicyChange};
pub use backend::{AdmissionBackend, BatchApplyOutcome, PerUserBatchAdapter, PerUserTransport};
pub use engine::{available_actions, decide, Action, BatchAction, Decision};
pub use errors::{BackendError, WaitingRoomError};
pub use lifecycle::{spawn_lifecycle_controller, PanelLayout, PanelLifecycle};
pub use registry::{registry_channel, RegistryHandle, RegistryReceiver, WaitingRoomSnapshot};
pub use types::{
    AdmissionDecision, AdmissionStatus, GuestPolicy, PendingQueues, PendingUser, SessionFlags,
    UserRole,
};
