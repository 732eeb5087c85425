//! The virtual-user runtime.
//!
//! [`run`] spawns one task per virtual user. Each user repeatedly opens a
//! fresh browser session, executes one iteration of the order flow, records
//! its timings, closes the session and then sleeps a random think time. The
//! run ends at the configured deadline, or earlier on Ctrl-C; in-flight
//! iterations are allowed to finish either way.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sketches_ddsketch::DDSketch;
use tokio_util::sync::CancellationToken;

use shopstress_scenario::browser::{BrowserResult, BrowserSession};
use shopstress_scenario::{FlowTimings, OrderFlow};
use shopstress_webdriver::{WebDriver, WebDriverSession};

use crate::config::Config;

/// Supplies a fresh browser session per scenario iteration.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    /// The session type handed to the scenario.
    type Session: BrowserSession + 'static;

    /// Opens a fresh session.
    async fn create(&self) -> BrowserResult<Self::Session>;

    /// Tears a session down once its iteration is over.
    ///
    /// Teardown problems must not fail the run; implementations log them.
    async fn destroy(&self, session: Self::Session);
}

#[async_trait::async_trait]
impl SessionProvider for WebDriver {
    type Session = WebDriverSession;

    async fn create(&self) -> BrowserResult<WebDriverSession> {
        self.new_session().await
    }

    async fn destroy(&self, session: WebDriverSession) {
        if let Err(error) = session.close().await {
            tracing::warn!(error = &error as &dyn std::error::Error, "failed to close browser session");
        }
    }
}

/// Pacing and sizing for one load-test run.
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    /// Number of concurrent virtual users.
    pub users: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// Shortest think time between iterations of one user.
    pub wait_min: Duration,
    /// Longest think time between iterations of one user.
    pub wait_max: Duration,
    /// Base seed; each user derives its own RNG from it.
    pub seed: u64,
}

impl RunOptions {
    /// Derives run options from the loaded configuration.
    ///
    /// A missing seed is replaced by a random one so that the effective seed
    /// can always be reported.
    pub fn from_config(config: &Config) -> Self {
        Self {
            users: config.users,
            duration: config.duration,
            wait_min: config.wait_time.min,
            wait_max: config.wait_time.max,
            seed: config.seed.unwrap_or_else(rand::random),
        }
    }
}

/// Aggregated outcome of a finished run.
#[derive(Default)]
pub struct RunReport {
    /// Actual wall-clock time spent running.
    pub elapsed: Duration,
    /// Completed iterations.
    pub iterations: u64,
    /// Aborted iterations, including sessions that failed to open.
    pub failures: u64,
    /// Total products added across all completed iterations.
    pub products_added: u64,

    /// Timing of whole iterations.
    pub iteration_timing: DDSketch,
    /// Timing of the login step.
    pub login_timing: DDSketch,
    /// Timing of the cart-filling step.
    pub add_to_cart_timing: DDSketch,
    /// Timing of the checkout step.
    pub place_order_timing: DDSketch,
}

impl RunReport {
    fn record_success(&mut self, elapsed: Duration, timings: FlowTimings) {
        self.iterations += 1;
        self.products_added += u64::from(timings.products_added);
        self.iteration_timing.add(elapsed.as_secs_f64());
        self.login_timing.add(timings.login.as_secs_f64());
        self.add_to_cart_timing.add(timings.add_to_cart.as_secs_f64());
        self.place_order_timing.add(timings.place_order.as_secs_f64());
    }

    fn record_failure(&mut self) {
        self.failures += 1;
    }
}

/// Runs the load test and returns the aggregated report.
pub async fn run<P>(provider: P, flow: OrderFlow, options: RunOptions) -> RunReport
where
    P: SessionProvider,
{
    tracing::info!(
        users = options.users,
        duration = ?options.duration,
        seed = options.seed,
        "starting load test"
    );

    let provider = Arc::new(provider);
    let flow = Arc::new(flow);
    let report = Arc::new(Mutex::new(RunReport::default()));
    let cancel = CancellationToken::new();

    // Stop at the deadline, or earlier on Ctrl-C.
    let deadline = tokio::time::Instant::now() + options.duration;
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                _ = interrupted() => {
                    tracing::info!("interrupted, finishing in-flight iterations");
                }
            }
            cancel.cancel();
        }
    });

    let start = Instant::now();
    let users: Vec<_> = (0..options.users)
        .map(|index| {
            let provider = Arc::clone(&provider);
            let flow = Arc::clone(&flow);
            let report = Arc::clone(&report);
            let cancel = cancel.clone();
            let rng = SmallRng::seed_from_u64(options.seed.wrapping_add(index as u64));
            tokio::spawn(user_loop(provider, flow, report, cancel, rng, options))
        })
        .collect();

    futures::future::join_all(users).await;

    let mut report = std::mem::take(&mut *report.lock().unwrap());
    report.elapsed = start.elapsed();

    tracing::info!(
        iterations = report.iterations,
        failures = report.failures,
        "load test finished"
    );
    report
}

async fn user_loop<P: SessionProvider>(
    provider: Arc<P>,
    flow: Arc<OrderFlow>,
    report: Arc<Mutex<RunReport>>,
    cancel: CancellationToken,
    mut rng: SmallRng,
    options: RunOptions,
) {
    while !cancel.is_cancelled() {
        let start = Instant::now();
        let outcome = run_iteration(&*provider, &flow, &mut rng).await;
        let elapsed = start.elapsed();

        {
            let mut report = report.lock().unwrap();
            match outcome {
                Ok(timings) => report.record_success(elapsed, timings),
                Err(error) => {
                    tracing::warn!(error = &error as &dyn std::error::Error, "iteration failed");
                    report.record_failure();
                }
            }
        }

        let wait = rng.random_range(options.wait_min..=options.wait_max);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => break,
        }
    }
}

async fn run_iteration<P: SessionProvider>(
    provider: &P,
    flow: &OrderFlow,
    rng: &mut SmallRng,
) -> BrowserResult<FlowTimings> {
    let session = provider.create().await?;
    let result = flow.run(&session, rng).await;
    provider.destroy(session).await;
    result
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be registered.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use shopstress_scenario::People;
    use shopstress_scenario::browser::BrowserError;
    use shopstress_scenario::people::Person;
    use shopstress_test::browser::ScriptedBrowser;

    use super::*;

    /// Hands out clones of a scripted browser as fresh sessions.
    #[derive(Debug)]
    struct ScriptedProvider {
        template: ScriptedBrowser,
        fail_create: bool,
    }

    #[async_trait::async_trait]
    impl SessionProvider for ScriptedProvider {
        type Session = ScriptedBrowser;

        async fn create(&self) -> BrowserResult<ScriptedBrowser> {
            if self.fail_create {
                return Err(BrowserError::session("driver unreachable"));
            }
            Ok(self.template.clone())
        }

        async fn destroy(&self, _session: ScriptedBrowser) {}
    }

    fn flow_fixture() -> OrderFlow {
        let people = People::from_records(vec![Person {
            address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip: "62704".into(),
            country: "US".into(),
        }])
        .unwrap();
        OrderFlow::new("https://localhost:7298/", people)
    }

    fn options_fixture() -> RunOptions {
        RunOptions {
            users: 2,
            duration: Duration::from_secs(10),
            wait_min: Duration::from_secs(1),
            wait_max: Duration::from_secs(2),
            seed: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn users_iterate_until_the_deadline() {
        shopstress_test::tracing::init();

        let template = ScriptedBrowser::new();
        let provider = ScriptedProvider {
            template: template.clone(),
            fail_create: false,
        };

        let report = run(provider, flow_fixture(), options_fixture()).await;

        // Two users with 1-2s think time over 10s: several iterations each.
        assert!(report.iterations >= 4, "only {} iterations", report.iterations);
        assert_eq!(report.failures, 0);
        assert!(report.products_added >= report.iterations);
        assert_eq!(report.iteration_timing.count() as u64, report.iterations);
        assert_eq!(report.login_timing.count() as u64, report.iterations);

        // Both accounts were exercised.
        let usernames: std::collections::HashSet<_> = template
            .fills()
            .into_iter()
            .filter(|(selector, _)| selector == "#Username")
            .map(|(_, value)| value)
            .collect();
        assert_eq!(usernames.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_clicks_become_failed_iterations() {
        shopstress_test::tracing::init();

        let template = ScriptedBrowser::new();
        template.fail_clicks_matching("Add to basket");
        let provider = ScriptedProvider {
            template: template.clone(),
            fail_create: false,
        };

        let report = run(provider, flow_fixture(), options_fixture()).await;

        assert_eq!(report.iterations, 0);
        assert!(report.failures > 0);
        // No iteration ever reached checkout.
        assert_eq!(report.place_order_timing.count(), 0);
        assert!(!template.navigations().iter().any(|url| url.ends_with("/checkout")));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_driver_is_counted_not_spun_on() {
        shopstress_test::tracing::init();

        let provider = ScriptedProvider {
            template: ScriptedBrowser::new(),
            fail_create: true,
        };

        let report = run(provider, flow_fixture(), options_fixture()).await;

        assert_eq!(report.iterations, 0);
        assert!(report.failures > 0);
        // Think time still paces failed iterations: two users, 1-2s waits,
        // 10 seconds. Far fewer attempts than a busy loop would make.
        assert!(report.failures <= 30, "{} failures", report.failures);
    }
}
