//! Verax Judgment - the final finding record
//!
//! Combines promise, outcome, acknowledgment and evidence into an
//! immutable finding with a deterministic identity: the identity hash
//! names the finding across runs, the determinism hash fingerprints its
//! content with every volatile field excluded.

#![deny(unsafe_code)]

mod builder;
mod identity;
mod order;

pub use builder::*;
pub use identity::*;
pub use order::*;
