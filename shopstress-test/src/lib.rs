//! Test utilities for shopstress and its crates.
//!
//! This crate provides a scripted browser double for exercising the runner
//! without a real WebDriver endpoint, plus a tracing initializer for tests.

pub mod browser;
pub mod tracing;
