//! wolfies-broadcast library
//!
//! Paced, verified delivery of personalized messages through a messaging
//! session bridge, without messaging the same contact twice.
//!
//! CHANGELOG:
//! - 10/12/2026 - Initial library structure

pub mod batch;
pub mod config;
pub mod contacts;
pub mod delivery;
pub mod error;
pub mod fallback;
pub mod output;
pub mod pacing;
pub mod policy;
pub mod transport;

pub use batch::{BatchItem, BatchOptions, BatchReport, BatchRunner};
pub use contacts::RecipientIdentity;
pub use delivery::{DeliveryOptions, DeliveryOutcome};
pub use error::{BatchError, DeliveryError, IdentityError, TransportError};
pub use transport::Transport;
