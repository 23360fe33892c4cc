//! Integration test utilities for the offline sync workspace
//!
//! This crate provides a fake hosted backend (REST rows, signed storage URLs,
//! health endpoint) and helpers for temporary caches and optional Redis.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
