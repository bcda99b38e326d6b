//! Verax Silence - absence of evidence, accounted for
//!
//! Silence is never ignored: when expected acknowledgment does not arrive
//! it is classified from ancillary evidence, and every skipped, capped or
//! timed-out item is written to the ledger. The ledger is the audit trail
//! that makes the engine's own blind spots inspectable.

#![deny(unsafe_code)]

mod classifier;
mod ledger;

pub use classifier::*;
pub use ledger::*;
