//! The load runner binary.
//!
//! This crate turns the scenario library into a runnable load test: it loads
//! configuration, spawns the configured number of virtual users against a
//! WebDriver endpoint, paces their iterations with a wait-time distribution,
//! and prints an aggregated timing report when the run ends.

pub mod cli;
pub mod config;
pub mod harness;
pub mod observability;
pub mod report;
