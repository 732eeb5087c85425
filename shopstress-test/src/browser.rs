//! An in-memory browser double for runner tests.

use std::sync::{Arc, Mutex};

use shopstress_scenario::browser::{BrowserError, BrowserResult, BrowserSession, Key};

/// A single recorded browser interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// The page was navigated to a URL.
    Navigate(String),
    /// An input was cleared and typed into.
    Fill {
        /// CSS selector of the input.
        selector: String,
        /// The typed value.
        value: String,
    },
    /// An element was clicked.
    Click(String),
    /// A key was pressed on the page keyboard.
    PressKey(Key),
    /// The scenario waited for network idleness.
    WaitForNetworkIdle,
}

/// A browser session double that records every interaction.
///
/// Clones share the same action log and failure script, so a test can hold
/// one handle for inspection while the code under test drives others. This
/// makes the double usable as a session "template": hand out clones as
/// fresh sessions and observe all traffic through the retained handle.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBrowser {
    actions: Arc<Mutex<Vec<Action>>>,
    fail_clicks_matching: Arc<Mutex<Option<String>>>,
}

impl ScriptedBrowser {
    /// Creates a double that accepts every interaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every click on a selector containing `needle` fail with
    /// [`BrowserError::ElementNotFound`].
    pub fn fail_clicks_matching(&self, needle: &str) {
        *self.fail_clicks_matching.lock().unwrap() = Some(needle.to_owned());
    }

    /// All interactions recorded so far, in order.
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    /// The URLs navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    /// The `(selector, value)` pairs filled, in order.
    pub fn fills(&self) -> Vec<(String, String)> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Fill { selector, value } => Some((selector, value)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait::async_trait]
impl BrowserSession for ScriptedBrowser {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.record(Action::Navigate(url.to_owned()));
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> BrowserResult<()> {
        self.record(Action::Fill {
            selector: selector.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        let failing = self.fail_clicks_matching.lock().unwrap().clone();
        if let Some(needle) = failing
            && selector.contains(&needle)
        {
            return Err(BrowserError::ElementNotFound {
                selector: selector.to_owned(),
            });
        }
        self.record(Action::Click(selector.to_owned()));
        Ok(())
    }

    async fn press_key(&self, key: Key) -> BrowserResult<()> {
        self.record(Action::PressKey(key));
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> BrowserResult<()> {
        self.record(Action::WaitForNetworkIdle);
        Ok(())
    }
}
