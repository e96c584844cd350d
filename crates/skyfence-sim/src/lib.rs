//! Simulation kernel for SKYFENCE.
//!
//! Owns the hecs ECS world, drives hostile and interceptor motion,
//! synthesizes sensor observations, fuses them into scored tracks, and
//! runs the engagement pipeline — all behind a headless, deterministic
//! `tick(dt)` entry point.

pub mod engagement;
pub mod engine;
pub mod fusion;
pub mod guidance;
pub mod sensors;
pub mod systems;
pub mod threat;
pub mod world_setup;

pub use engine::{SimConfig, SimulationEngine};
pub use skyfence_core as core;

#[cfg(test)]
mod tests;
