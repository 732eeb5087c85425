//! A [`BrowserSession`](shopstress_scenario::BrowserSession) implementation
//! speaking the W3C WebDriver protocol.
//!
//! This drives a chromedriver-compatible endpoint over plain JSON-over-HTTP;
//! only the handful of commands the scenario needs are implemented. Network
//! idleness is not part of the WebDriver protocol, so
//! [`wait_for_network_idle`](shopstress_scenario::BrowserSession::wait_for_network_idle)
//! is approximated by polling the page's ready state and resource-timing
//! entry count until both have been stable for a quiet window.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod protocol;
mod session;

pub use crate::session::{WebDriver, WebDriverSession};
