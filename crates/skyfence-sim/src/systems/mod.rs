//! Per-tick systems operating on the simulation world.
//!
//! Systems are functions over `&mut World`; they own no state. Iteration
//! is id-sorted so rng draws land in the same order every run.

pub mod hostile_motion;
pub mod interceptor;
