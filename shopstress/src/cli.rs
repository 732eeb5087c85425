//! Command line entry point for the load runner.

use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;

use shopstress_scenario::{OrderFlow, People};
use shopstress_webdriver::WebDriver;

use crate::config::Config;
use crate::harness::{self, RunOptions};
use crate::{observability, report};

/// Browser-driven load generator for the storefront.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Version(VersionCommand),
}

/// run the load test
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {}

/// print the runner version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    // Special switch to just print the version and exit.
    if let Command::Version(_) = args.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;

    observability::init_tracing(&config);
    tracing::debug!(?config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    runtime.block_on(async move {
        match args.command {
            Command::Run(RunCommand {}) => run(config).await,
            Command::Version(VersionCommand {}) => unreachable!(),
        }
    })
}

async fn run(config: Config) -> Result<()> {
    let people = People::load(&config.people_file).context("failed to load people file")?;
    tracing::info!(
        records = people.len(),
        path = %config.people_file.display(),
        "loaded checkout addresses"
    );

    let flow = OrderFlow::new(&config.target_url, people);
    let driver = WebDriver::new(&config.webdriver.url)
        .headless(config.webdriver.headless)
        .page_load_timeout(config.webdriver.page_load_timeout)
        .idle_window(config.webdriver.idle_quiet, config.webdriver.idle_timeout);

    let options = RunOptions::from_config(&config);
    let report = harness::run(driver, flow, options).await;
    report::print(&report);

    Ok(())
}
