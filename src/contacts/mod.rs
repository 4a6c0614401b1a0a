//! Contact identity: canonical forms and transport-side alias resolution.
//!
//! CHANGELOG:
//! - 10/12/2026 - Replaced name lookup with identity resolution

pub mod identity;
pub mod resolver;

pub use identity::{CountryPlan, RecipientIdentity};
pub use resolver::{resolve_transport_identity, Resolution, ResolutionSource};
