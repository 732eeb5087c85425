//! The scenario state machine: log in, fill the cart, place the order.
//!
//! [`OrderFlow`] holds the state shared by all virtual users (base URL,
//! address pool, user sequence counter) and executes one iteration per call
//! to [`run`](OrderFlow::run). The sequence is strictly ordered with no
//! branches: `LoggingIn` → `AddingToCart` → `PlacingOrder`. Nothing checks
//! whether an individual step had the intended effect on the storefront; a
//! browser-level failure is the only thing that aborts an iteration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

use crate::browser::{BrowserResult, BrowserSession, Key};
use crate::catalog::{self, Credentials, PRODUCTS};
use crate::people::People;

const LOGIN_PATH: &str = "user/login?returnUrl=";
const CHECKOUT_PATH: &str = "checkout";

const USERNAME_FIELD: &str = "#Username";
const PASSWORD_FIELD: &str = "#Password";
const LOGIN_BUTTON: &str = r#"button[value="login"]"#;
const ADD_TO_BASKET_BUTTON: &str = r#"button[type="submit"][title="Add to basket"]"#;

const STREET_FIELD: &str = r#"input[name="Info.Street"]"#;
const CITY_FIELD: &str = r#"input[name="Info.City"]"#;
const STATE_FIELD: &str = r#"input[name="Info.State"]"#;
const ZIP_FIELD: &str = r#"input[name="Info.ZipCode"]"#;
const COUNTRY_FIELD: &str = r#"input[name="Info.Country"]"#;

/// Per-step timings of one completed iteration.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlowTimings {
    /// Time spent on the login page.
    pub login: Duration,
    /// Time spent adding products, across all cart-add actions.
    pub add_to_cart: Duration,
    /// Time spent on the checkout page.
    pub place_order: Duration,
    /// How many products were added to the cart this iteration.
    pub products_added: u32,
}

/// The place-order scenario, shared by all virtual users.
///
/// The user sequence counter is incremented atomically once per invocation
/// and only drives credential alternation; two iterations starting at the
/// same instant still receive distinct sequence numbers.
#[derive(Debug)]
pub struct OrderFlow {
    base_url: String,
    people: People,
    user_seq: AtomicU64,
}

impl OrderFlow {
    /// Creates a flow targeting the storefront at `base_url`.
    pub fn new(base_url: &str, people: People) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            people,
            user_seq: AtomicU64::new(0),
        }
    }

    /// Runs one complete iteration against the given browser session.
    ///
    /// Any failed browser action aborts the iteration immediately; later
    /// steps are not attempted and nothing is rolled back.
    pub async fn run<B>(&self, browser: &B, rng: &mut SmallRng) -> BrowserResult<FlowTimings>
    where
        B: BrowserSession + ?Sized,
    {
        let sequence = self.user_seq.fetch_add(1, Ordering::Relaxed);
        let credentials = catalog::credentials_for(sequence);
        tracing::debug!(sequence, username = credentials.username, "starting order flow");

        let start = Instant::now();
        self.login(browser, credentials).await?;
        let login = start.elapsed();

        let start = Instant::now();
        let products_added = self.add_products_to_cart(browser, rng).await?;
        let add_to_cart = start.elapsed();

        let start = Instant::now();
        self.place_order(browser, rng).await?;
        let place_order = start.elapsed();

        tracing::debug!(sequence, products_added, "order flow done");

        Ok(FlowTimings {
            login,
            add_to_cart,
            place_order,
            products_added,
        })
    }

    async fn login<B>(&self, browser: &B, credentials: Credentials) -> BrowserResult<()>
    where
        B: BrowserSession + ?Sized,
    {
        tracing::debug!("login start");
        browser
            .navigate(&format!("{}/{LOGIN_PATH}", self.base_url))
            .await?;
        browser.fill(USERNAME_FIELD, credentials.username).await?;
        browser.fill(PASSWORD_FIELD, credentials.password).await?;
        browser.click(LOGIN_BUTTON).await?;
        // A rejected login is not detected here; the flow proceeds either way.
        browser.wait_for_network_idle().await?;
        tracing::debug!("login done");
        Ok(())
    }

    async fn add_products_to_cart<B>(&self, browser: &B, rng: &mut SmallRng) -> BrowserResult<u32>
    where
        B: BrowserSession + ?Sized,
    {
        let count = rng.random_range(1..=4);
        tracing::debug!(count, "adding products to cart");
        for _ in 0..count {
            let product = PRODUCTS.choose(rng).expect("catalog is never empty");
            browser
                .navigate(&format!("{}/item/{product}", self.base_url))
                .await?;
            browser.click(ADD_TO_BASKET_BUTTON).await?;
            browser.wait_for_network_idle().await?;
        }
        tracing::debug!("cart filled");
        Ok(count)
    }

    async fn place_order<B>(&self, browser: &B, rng: &mut SmallRng) -> BrowserResult<()>
    where
        B: BrowserSession + ?Sized,
    {
        tracing::debug!("place order start");
        browser
            .navigate(&format!("{}/{CHECKOUT_PATH}", self.base_url))
            .await?;

        let person = self.people.choose(rng);
        browser.fill(STREET_FIELD, &person.address).await?;
        browser.fill(CITY_FIELD, &person.city).await?;
        browser.fill(STATE_FIELD, &person.state).await?;
        browser.fill(ZIP_FIELD, &person.zip).await?;
        browser.fill(COUNTRY_FIELD, &person.country).await?;

        // The checkout form submits on Enter; there is no submit click.
        browser.press_key(Key::Enter).await?;
        browser.wait_for_network_idle().await?;
        tracing::debug!("place order done");
        Ok(())
    }
}
