//! Integration test utilities for the NOXLY redemption server
//!
//! This crate provides an in-memory store implementing every repository
//! trait, a service-level harness with a controllable clock and code source,
//! and helpers for driving the REST API end to end.

pub mod fixtures;
pub mod memory;

pub use fixtures::*;
pub use helpers::*;
pub use memory::MemoryStore;
