//! Core types and definitions for the SKYFENCE counter-UAS simulator.
//!
//! This crate defines the vocabulary shared across all other crates:
//! geometric types, components, observations, tracks, commands, events,
//! configuration, and constants. It has no dependency on the ECS runtime
//! or any host framework.

pub mod commands;
pub mod components;
pub mod config;
pub mod constants;
pub mod enums;
pub mod events;
pub mod observation;
pub mod scenario;
pub mod track;
pub mod types;
