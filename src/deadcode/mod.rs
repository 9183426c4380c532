//! Dead-code detection (§4.7): unreachable-code/branch plus dead-assignment
//! elimination, built on a backward live-variable analysis.

pub mod detector;
pub mod liveness;
