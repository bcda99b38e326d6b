//! Verax Acknowledgment - graded evidence that a promise was met
//!
//! Two stages: the anti-false-green filter strips signals that acknowledge
//! nothing (spinners, skeletons, micro DOM churn), then the engine grades
//! what remains against the observation profile. Both are pure.

#![deny(unsafe_code)]

mod engine;
mod filter;

pub use engine::*;
pub use filter::*;
