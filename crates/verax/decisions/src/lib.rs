//! Verax Decisions - the determinism lock
//!
//! Every adaptive decision the engine takes (retries, truncations,
//! stretched stabilization windows) is recorded. The lock is a hard rule:
//! one adaptive event and the run is non-deterministic, no matter how
//! clean the artifacts look after normalization. Normalization exists to
//! compare runs, never to hide behavior.

#![deny(unsafe_code)]

mod lock;
mod normalize;
mod recorder;

pub use lock::*;
pub use normalize::*;
pub use recorder::*;
