//! W3C WebDriver wire payloads and error mapping.
//!
//! Covers only the subset of the protocol the scenario needs: session
//! creation, navigation, element lookup by CSS selector, element
//! interaction, key actions and synchronous script execution.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use shopstress_scenario::browser::{BrowserError, Key};

/// The W3C key under which element references are returned.
pub(crate) const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Script returning the data for one network-idle probe.
pub(crate) const IDLE_PROBE_SCRIPT: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

/// Every WebDriver response wraps its payload in a `value` field.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseEnvelope {
    pub value: Value,
}

/// The error payload WebDriver returns for non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub error: String,
    pub message: String,
}

/// Payload of a successful `POST /session`.
#[derive(Debug, Deserialize)]
pub(crate) struct NewSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NavigateTo<'a> {
    pub url: &'a str,
}

/// Element lookup request; we only ever locate by CSS selector.
#[derive(Debug, Serialize)]
pub(crate) struct LocateBy<'a> {
    pub using: &'static str,
    pub value: &'a str,
}

impl<'a> LocateBy<'a> {
    pub(crate) fn css(selector: &'a str) -> Self {
        Self {
            using: "css selector",
            value: selector,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SendKeys<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExecuteScript<'a> {
    pub script: &'a str,
    pub args: [(); 0],
}

impl<'a> ExecuteScript<'a> {
    pub(crate) fn new(script: &'a str) -> Self {
        Self { script, args: [] }
    }
}

/// New-session capabilities for a chromedriver-compatible endpoint.
pub(crate) fn chrome_capabilities(headless: bool) -> Value {
    let mut args: Vec<&str> = vec!["--window-size=1920,1080"];
    if headless {
        args.push("--headless=new");
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

/// A key-press action sequence (key down, key up).
pub(crate) fn key_press_actions(key: Key) -> Value {
    let code = key_code(key);
    json!({
        "actions": [{
            "type": "key",
            "id": "keyboard",
            "actions": [
                { "type": "keyDown", "value": code },
                { "type": "keyUp", "value": code },
            ]
        }]
    })
}

/// The WebDriver code point for a [`Key`].
pub(crate) fn key_code(key: Key) -> &'static str {
    match key {
        Key::Enter => "\u{E007}",
    }
}

/// Extracts the element reference from an element-lookup response payload.
pub(crate) fn element_id(value: &Value) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Parses the result of [`IDLE_PROBE_SCRIPT`] into (ready, resource count).
pub(crate) fn parse_idle_probe(value: &Value) -> Option<(bool, u64)> {
    let entries = value.as_array()?;
    let ready = entries.first()?.as_str()? == "complete";
    let resources = entries.get(1)?.as_u64()?;
    Some((ready, resources))
}

/// A failed WebDriver command, before mapping to the session error taxonomy.
#[derive(Debug)]
pub(crate) enum CommandError {
    /// The HTTP request itself failed.
    Transport(reqwest::Error),
    /// The endpoint answered with a WebDriver error payload.
    Wire(WireError),
    /// The endpoint answered with something we could not interpret.
    Malformed,
}

/// Maps a failed command onto the scenario's error taxonomy.
///
/// `selector` is attached when the command was locating or interacting with
/// an element, so "no such element" keeps the selector that missed.
pub(crate) fn browser_error(
    error: CommandError,
    operation: &str,
    selector: Option<&str>,
) -> BrowserError {
    match error {
        CommandError::Transport(cause) if cause.is_timeout() => BrowserError::Timeout {
            operation: operation.to_owned(),
        },
        CommandError::Transport(cause) => {
            BrowserError::session_with(format!("{operation} request failed"), cause)
        }
        CommandError::Wire(wire) => match wire.error.as_str() {
            "no such element" | "stale element reference" => BrowserError::ElementNotFound {
                selector: selector.unwrap_or(operation).to_owned(),
            },
            "timeout" | "script timeout" => BrowserError::Timeout {
                operation: operation.to_owned(),
            },
            _ => BrowserError::session(format!("{operation}: {} ({})", wire.message, wire.error)),
        },
        CommandError::Malformed => {
            BrowserError::session(format!("{operation}: unexpected response from driver"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_lookup_payload() {
        let payload = serde_json::to_value(LocateBy::css("#Username")).unwrap();
        assert_eq!(
            payload,
            json!({ "using": "css selector", "value": "#Username" })
        );
    }

    #[test]
    fn execute_script_payload_has_empty_args() {
        let payload = serde_json::to_value(ExecuteScript::new("return 1;")).unwrap();
        assert_eq!(payload, json!({ "script": "return 1;", "args": [] }));
    }

    #[test]
    fn headless_capabilities_request_new_headless_mode() {
        let capabilities = chrome_capabilities(true);
        let args = &capabilities["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        assert!(args.as_array().unwrap().contains(&json!("--headless=new")));

        let headful = chrome_capabilities(false);
        let args = &headful["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        assert!(!args.as_array().unwrap().contains(&json!("--headless=new")));
    }

    #[test]
    fn enter_maps_to_the_webdriver_code_point() {
        assert_eq!(key_code(Key::Enter), "\u{E007}");

        let actions = key_press_actions(Key::Enter);
        let sequence = actions["actions"][0]["actions"].as_array().unwrap();
        assert_eq!(sequence[0]["type"], "keyDown");
        assert_eq!(sequence[1]["type"], "keyUp");
    }

    #[test]
    fn element_reference_extraction() {
        let value = json!({ "element-6066-11e4-a52e-4f735466cecf": "deadbeef" });
        assert_eq!(element_id(&value).as_deref(), Some("deadbeef"));
        assert_eq!(element_id(&json!({})), None);
    }

    #[test]
    fn idle_probe_parsing() {
        assert_eq!(parse_idle_probe(&json!(["complete", 12])), Some((true, 12)));
        assert_eq!(parse_idle_probe(&json!(["loading", 3])), Some((false, 3)));
        assert_eq!(parse_idle_probe(&json!("nope")), None);
    }

    #[test]
    fn missing_element_keeps_the_selector() {
        let wire = WireError {
            error: "no such element".into(),
            message: "Unable to locate element".into(),
        };
        let error = browser_error(CommandError::Wire(wire), "click", Some("#Password"));
        assert!(
            matches!(error, BrowserError::ElementNotFound { selector } if selector == "#Password")
        );
    }

    #[test]
    fn script_timeouts_map_to_timeout() {
        let wire = WireError {
            error: "script timeout".into(),
            message: "script did not finish".into(),
        };
        let error = browser_error(CommandError::Wire(wire), "network idle wait", None);
        assert!(matches!(error, BrowserError::Timeout { .. }));
    }

    #[test]
    fn unknown_wire_errors_become_session_errors() {
        let wire = WireError {
            error: "invalid session id".into(),
            message: "session deleted".into(),
        };
        let error = browser_error(CommandError::Wire(wire), "navigate", None);
        assert!(matches!(error, BrowserError::Session { .. }));
    }
}
