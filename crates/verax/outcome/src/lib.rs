//! Verax Outcome - from graded evidence to a verdict
//!
//! The truth matrix derives an outcome from acknowledgment, silence and
//! network state; the evidence law gates every failure verdict behind a
//! closed rule set. The engine must never report failure it cannot prove.

#![deny(unsafe_code)]

mod law;
mod matrix;

pub use law::*;
pub use matrix::*;
