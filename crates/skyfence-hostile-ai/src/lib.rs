//! Hostile behavior AI for SKYFENCE.
//!
//! Implements the hostile behavior state machine and per-airframe motion
//! profiles. Pure data in, update out — no ECS dependency.

pub mod fsm;
pub mod profiles;

pub use skyfence_core as core;

#[cfg(test)]
mod tests;
