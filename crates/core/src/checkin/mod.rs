//! Check-in validation.
//!
//! Before a check-in the client loads, for every server owning one of the
//! files, the check-in notes the server declares and the policies attached
//! to the affected team projects:
//!
//! 1. **Discovery** -- [`discovery::discover`] queries notes, compatibility
//!    overrides and policy annotations.
//! 2. **Evaluation** -- [`CheckinParameters::evaluate_policies`] runs the
//!    installed [`CheckinPolicy`] implementations and collects failures.
//! 3. **Notes** -- [`CheckinParameters::validate_notes`] finds required notes
//!    without a value.
//!
//! [`CheckinParameters::validation_message`] combines the results.

pub mod builtin;
pub mod compat;
pub mod discovery;
pub mod notes;
pub mod params;
pub mod parser;
pub mod policy;
pub mod work_items;
mod xml;

pub use compat::PoliciesCompatibility;
pub use discovery::{discover, DiscoveredServer, Discovery, TeamProjectPolicies};
pub use notes::CheckinNote;
pub use params::{CheckinParameters, PolicyOverride, Severity, ValidationMessage};
pub use policy::{
    CheckinPolicy, DescriptorFormat, FailureKind, PolicyContext, PolicyDescriptor, PolicyFailure,
    PolicyRegistry, PolicyType,
};
pub use work_items::{WorkItem, WorkItemAction, WorkItemsCheckinParameters};
