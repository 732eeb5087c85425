//! The browser capability the scenario is written against.
//!
//! A [`BrowserSession`] represents one live page that can be navigated,
//! filled and clicked. Implementations decide what actually drives the
//! browser; the scenario only depends on this trait.

use std::fmt::Debug;

use thiserror::Error;

/// A key that can be pressed on the page keyboard.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    /// The Enter/Return key.
    Enter,
}

/// One live browser page, driven by the scenario.
///
/// All operations suspend until the browser has acknowledged the action.
/// Selectors are CSS selectors.
#[async_trait::async_trait]
pub trait BrowserSession: Debug + Send + Sync {
    /// Navigates the page to the given absolute URL.
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// Clears the element matching `selector` and types `value` into it.
    async fn fill(&self, selector: &str, value: &str) -> BrowserResult<()>;

    /// Clicks the element matching `selector`.
    async fn click(&self, selector: &str) -> BrowserResult<()>;

    /// Presses and releases a key on the page keyboard.
    async fn press_key(&self, key: Key) -> BrowserResult<()>;

    /// Suspends until no network activity is observed on the page.
    async fn wait_for_network_idle(&self) -> BrowserResult<()>;
}

/// Errors surfaced by a browser session.
///
/// The scenario does not distinguish further than this; any of these aborts
/// the current iteration.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// No element in the current page matches the selector.
    #[error("no element matches `{selector}`")]
    ElementNotFound {
        /// The CSS selector that failed to match.
        selector: String,
    },

    /// A navigation, script or wait did not finish in time.
    #[error("timed out during {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },

    /// Any other problem with the session, e.g. a transport error talking to
    /// the driver or an unexpected protocol response.
    #[error("browser session error: {context}")]
    Session {
        /// Human-readable description of what went wrong.
        context: String,
        /// The underlying error, if there is one.
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BrowserError {
    /// Creates a [`BrowserError::Session`] without an underlying cause.
    pub fn session(context: impl Into<String>) -> Self {
        BrowserError::Session {
            context: context.into(),
            cause: None,
        }
    }

    /// Creates a [`BrowserError::Session`] wrapping an underlying error.
    pub fn session_with(
        context: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BrowserError::Session {
            context: context.into(),
            cause: Some(Box::new(cause)),
        }
    }
}

/// Result type for browser operations.
pub type BrowserResult<T> = Result<T, BrowserError>;
