//! TFVC client-side reconciliation.
//!
//! This crate provides the two halves of reconciling a local workspace with a
//! Team Foundation server: conflict classification and resolution after a
//! get or merge, and check-in validation (required notes and check-in
//! policies) before a check-in.

pub mod cancel;
pub mod checkin;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod proxy;
pub mod vcpath;
pub mod workspace;

// Re-exports for convenience.
pub use cancel::Cancellation;
pub use checkin::{CheckinParameters, PoliciesCompatibility, PolicyRegistry};
pub use config::AppConfig;
pub use conflict::{ConflictRegistry, ConflictResolver};
pub use errors::CoreError;
pub use proxy::ServerProxy;
pub use workspace::{ServerInfo, Workspace};
