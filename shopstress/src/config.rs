//! Configuration for the load runner.
//!
//! Configuration can be loaded from multiple sources with the following
//! precedence (highest to lowest):
//!
//! 1. Environment variables (prefixed with `SHOPSTRESS__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! Environment variables use double underscores (`__`) to denote nested
//! configuration structures. For example:
//!
//! - `SHOPSTRESS__USERS=50` sets the number of virtual users
//! - `SHOPSTRESS__WAIT_TIME__MAX=5s` caps the think time between iterations
//! - `SHOPSTRESS__WEBDRIVER__URL=http://chromedriver:9515` points at the
//!   browser driver
//!
//! The equivalent YAML:
//!
//! ```yaml
//! users: 50
//! wait_time:
//!   max: 5s
//! webdriver:
//!   url: http://chromedriver:9515
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "SHOPSTRESS__";

/// Think time between two iterations of the same virtual user.
///
/// Each user sleeps a duration drawn uniformly from `[min, max]` after every
/// iteration, successful or not.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct WaitTime {
    /// Shortest think time. Default `1s`.
    #[serde(with = "humantime_serde")]
    pub min: Duration,

    /// Longest think time. Default `10s`.
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl Default for WaitTime {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(10),
        }
    }
}

/// Settings for the WebDriver endpoint driving the browsers.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// URL of a chromedriver-compatible endpoint.
    ///
    /// Default `http://localhost:9515`.
    pub url: String,

    /// Whether browsers run without a visible window. Default `true`.
    pub headless: bool,

    /// Driver-side limit on how long a single navigation may block.
    /// Default `30s`.
    #[serde(with = "humantime_serde")]
    pub page_load_timeout: Duration,

    /// The page counts as idle once no new network activity has been
    /// observed for this long. Default `500ms`.
    #[serde(with = "humantime_serde")]
    pub idle_quiet: Duration,

    /// Upper bound on a single network-idle wait. Default `30s`.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_owned(),
            headless: true,
            page_load_timeout: Duration::from_secs(30),
            idle_quiet: Duration::from_millis(500),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Logging configuration. Logs are always written to stderr.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output. Default `INFO`.
    ///
    /// The `RUST_LOG` environment variable takes precedence and allows
    /// per-module directives.
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
        }
    }
}

/// Main configuration for the load runner.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the storefront under test.
    ///
    /// Default `https://localhost:7298/`.
    pub target_url: String,

    /// Path to the JSON file with checkout address records.
    ///
    /// Read once on startup; the runner refuses to start without it.
    /// Default `people.json`.
    pub people_file: PathBuf,

    /// Number of concurrently simulated users. Default `10`.
    pub users: usize,

    /// Wall-clock duration of the run. Default `60s`.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Think time between iterations of one user.
    pub wait_time: WaitTime,

    /// Seed for all randomness in the run.
    ///
    /// Runs with the same seed, user count and people file draw the same
    /// products, cart sizes and addresses. Defaults to a random seed, which
    /// is logged on startup.
    pub seed: Option<u64>,

    /// Browser driver settings.
    pub webdriver: WebDriverConfig,

    /// Logging settings.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "https://localhost:7298/".to_owned(),
            people_file: PathBuf::from("people.json"),
            users: 10,
            duration: Duration::from_secs(60),
            wait_time: WaitTime::default(),
            seed: None,
            webdriver: WebDriverConfig::default(),
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, an optional YAML file, and the
    /// environment, in that order of precedence (later overrides earlier).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        if config.users == 0 {
            anyhow::bail!("users must be at least 1");
        }
        if config.wait_time.min > config.wait_time.max {
            anyhow::bail!("wait_time.min must not exceed wait_time.max");
        }

        Ok(config)
    }
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_the_storefront_demo() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();

            assert_eq!(config.target_url, "https://localhost:7298/");
            assert_eq!(config.people_file, PathBuf::from("people.json"));
            assert_eq!(config.users, 10);
            assert_eq!(config.wait_time.min, Duration::from_secs(1));
            assert_eq!(config.wait_time.max, Duration::from_secs(10));
            assert!(config.webdriver.headless);

            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHOPSTRESS__TARGET_URL", "http://shop.local/");
            jail.set_env("SHOPSTRESS__USERS", "50");
            jail.set_env("SHOPSTRESS__DURATION", "2m");
            jail.set_env("SHOPSTRESS__WAIT_TIME__MIN", "250ms");
            jail.set_env("SHOPSTRESS__WAIT_TIME__MAX", "2s");
            jail.set_env("SHOPSTRESS__WEBDRIVER__URL", "http://chromedriver:9515");
            jail.set_env("SHOPSTRESS__WEBDRIVER__HEADLESS", "false");
            jail.set_env("SHOPSTRESS__SEED", "42");

            let config = Config::load(None).unwrap();

            assert_eq!(config.target_url, "http://shop.local/");
            assert_eq!(config.users, 50);
            assert_eq!(config.duration, Duration::from_secs(120));
            assert_eq!(config.wait_time.min, Duration::from_millis(250));
            assert_eq!(config.wait_time.max, Duration::from_secs(2));
            assert_eq!(config.webdriver.url, "http://chromedriver:9515");
            assert!(!config.webdriver.headless);
            assert_eq!(config.seed, Some(42));

            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            target_url: http://shop.local/
            users: 5
            duration: 90s
            webdriver:
                url: http://chromedriver:9515
                idle_quiet: 250ms
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|_jail| {
            let config = Config::load(Some(tempfile.path())).unwrap();

            assert_eq!(config.target_url, "http://shop.local/");
            assert_eq!(config.users, 5);
            assert_eq!(config.duration, Duration::from_secs(90));
            assert_eq!(config.webdriver.url, "http://chromedriver:9515");
            assert_eq!(config.webdriver.idle_quiet, Duration::from_millis(250));
            // Untouched fields keep their defaults.
            assert_eq!(config.webdriver.idle_timeout, Duration::from_secs(30));

            Ok(())
        });
    }

    #[test]
    fn env_overrides_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile.write_all(b"users: 5").unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("SHOPSTRESS__USERS", "99");

            let config = Config::load(Some(tempfile.path())).unwrap();
            assert_eq!(config.users, 99);

            Ok(())
        });
    }

    #[test]
    fn rejects_zero_users() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHOPSTRESS__USERS", "0");
            assert!(Config::load(None).is_err());
            Ok(())
        });
    }

    #[test]
    fn rejects_inverted_wait_time() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHOPSTRESS__WAIT_TIME__MIN", "10s");
            jail.set_env("SHOPSTRESS__WAIT_TIME__MAX", "1s");
            assert!(Config::load(None).is_err());
            Ok(())
        });
    }
}
