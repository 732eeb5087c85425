//! WebDriver connection handling and live browser sessions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Value, json};

use shopstress_scenario::browser::{BrowserError, BrowserResult, BrowserSession, Key};

use crate::protocol::{
    self, CommandError, ExecuteScript, IDLE_PROBE_SCRIPT, LocateBy, NavigateTo, NewSession,
    ResponseEnvelope, SendKeys, WireError, browser_error, chrome_capabilities, key_press_actions,
};

/// How often the network-idle wait probes the page.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Connection settings for a chromedriver-compatible WebDriver endpoint.
///
/// Cheap to clone; all sessions created from one instance share the same
/// HTTP connection pool.
#[derive(Clone, Debug)]
pub struct WebDriver {
    server_url: Arc<str>,
    client: reqwest::Client,
    headless: bool,
    page_load_timeout: Duration,
    idle_quiet: Duration,
    idle_timeout: Duration,
}

impl WebDriver {
    /// Creates a driver handle targeting the given WebDriver endpoint.
    pub fn new(server_url: &str) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').into(),
            client: reqwest::Client::new(),
            headless: true,
            page_load_timeout: Duration::from_secs(30),
            idle_quiet: Duration::from_millis(500),
            idle_timeout: Duration::from_secs(30),
        }
    }

    /// Whether to launch the browser without a visible window.
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Driver-side limit on how long a navigation may block.
    pub fn page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    /// Tunes the network-idle wait: the page counts as idle once no new
    /// network activity has been observed for `quiet`; `timeout` bounds the
    /// whole wait.
    pub fn idle_window(mut self, quiet: Duration, timeout: Duration) -> Self {
        self.idle_quiet = quiet;
        self.idle_timeout = timeout;
        self
    }

    /// Starts a fresh browser session.
    pub async fn new_session(&self) -> BrowserResult<WebDriverSession> {
        let url = format!("{}/session", self.server_url);
        let value = post_command(&self.client, url, &chrome_capabilities(self.headless))
            .await
            .map_err(|error| browser_error(error, "create session", None))?;
        let created: NewSession = serde_json::from_value(value)
            .map_err(|_| BrowserError::session("malformed new-session response"))?;

        let session = WebDriverSession {
            driver: self.clone(),
            session_id: created.session_id,
        };

        // Navigations block until the page load event; bound them driver-side.
        session
            .command(
                "/timeouts",
                &json!({ "pageLoad": self.page_load_timeout.as_millis() as u64 }),
                "set timeouts",
                None,
            )
            .await?;

        tracing::debug!(session = %session.session_id, "browser session created");
        Ok(session)
    }
}

/// One live browser session.
///
/// Sessions are not reused across scenario iterations; create one per
/// iteration and [`close`](Self::close) it afterwards.
#[derive(Debug)]
pub struct WebDriverSession {
    driver: WebDriver,
    session_id: String,
}

impl WebDriverSession {
    /// The WebDriver session id, for diagnostics.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Deletes the session, closing the browser window.
    pub async fn close(self) -> BrowserResult<()> {
        let url = format!("{}/session/{}", self.driver.server_url, self.session_id);
        delete_command(&self.driver.client, url)
            .await
            .map_err(|error| browser_error(error, "close session", None))?;
        tracing::debug!(session = %self.session_id, "browser session closed");
        Ok(())
    }

    async fn command<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
        selector: Option<&str>,
    ) -> BrowserResult<Value> {
        let url = format!(
            "{}/session/{}{path}",
            self.driver.server_url, self.session_id
        );
        post_command(&self.driver.client, url, body)
            .await
            .map_err(|error| browser_error(error, operation, selector))
    }

    async fn find_element(&self, selector: &str) -> BrowserResult<String> {
        let value = self
            .command(
                "/element",
                &LocateBy::css(selector),
                "find element",
                Some(selector),
            )
            .await?;
        protocol::element_id(&value).ok_or_else(|| {
            BrowserError::session(format!("malformed element reference for `{selector}`"))
        })
    }

    async fn execute_script(&self, script: &str) -> BrowserResult<Value> {
        self.command(
            "/execute/sync",
            &ExecuteScript::new(script),
            "execute script",
            None,
        )
        .await
    }
}

#[async_trait::async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.command("/url", &NavigateTo { url }, "navigate", None)
            .await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> BrowserResult<()> {
        let element = self.find_element(selector).await?;
        self.command(
            &format!("/element/{element}/clear"),
            &json!({}),
            "clear field",
            Some(selector),
        )
        .await?;
        self.command(
            &format!("/element/{element}/value"),
            &SendKeys { text: value },
            "type into field",
            Some(selector),
        )
        .await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        let element = self.find_element(selector).await?;
        self.command(
            &format!("/element/{element}/click"),
            &json!({}),
            "click",
            Some(selector),
        )
        .await?;
        Ok(())
    }

    async fn press_key(&self, key: Key) -> BrowserResult<()> {
        self.command("/actions", &key_press_actions(key), "press key", None)
            .await?;
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> BrowserResult<()> {
        let deadline = Instant::now() + self.driver.idle_timeout;
        // Resource count and the instant it was last seen changing.
        let mut stable: Option<(u64, Instant)> = None;

        loop {
            let value = self.execute_script(IDLE_PROBE_SCRIPT).await?;

            if let Some((true, resources)) = protocol::parse_idle_probe(&value) {
                match stable {
                    Some((count, since)) if count == resources => {
                        if since.elapsed() >= self.driver.idle_quiet {
                            return Ok(());
                        }
                    }
                    _ => stable = Some((resources, Instant::now())),
                }
            } else {
                stable = None;
            }

            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    operation: "network idle wait".to_owned(),
                });
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}

async fn post_command<B: Serialize>(
    client: &reqwest::Client,
    url: String,
    body: &B,
) -> Result<Value, CommandError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(CommandError::Transport)?;
    handle_response(response).await
}

async fn delete_command(client: &reqwest::Client, url: String) -> Result<Value, CommandError> {
    let response = client
        .delete(url)
        .send()
        .await
        .map_err(CommandError::Transport)?;
    handle_response(response).await
}

async fn handle_response(response: reqwest::Response) -> Result<Value, CommandError> {
    let status = response.status();
    let envelope: ResponseEnvelope = response
        .json()
        .await
        .map_err(|_| CommandError::Malformed)?;

    if status.is_success() {
        return Ok(envelope.value);
    }

    match serde_json::from_value::<WireError>(envelope.value) {
        Ok(wire) => Err(CommandError::Wire(wire)),
        Err(_) => Err(CommandError::Malformed),
    }
}
