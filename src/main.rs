//! "Site checker" utility

#![forbid(unsafe_code)]
#![deny(
    missing_docs,
    unstable_features,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    unused_extern_crates
)]


use actix::prelude::*;
use chrono::Local;
use clap::Parser;
use sitecheck::{
    actors::{
        reporter::{Flush, Reporter},
        sweeper::{Sweep, Sweeper},
    },
    checks::store::{FileStore, Selection},
    config::Config,
    evaluators::fetcher::CurlTransport,
    products::{progress::SweepReport, unexpected::SweepError},
    *,
};
use std::{io, process::ExitCode, sync::Arc};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};


/// Use MiMalloc as default allocator:
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;


#[derive(Parser, Debug)]
#[command(author, version, about = "Checks availability, content freshness and required content of registered sites", long_about = None)]
struct Cli {
    /// Check only sites whose last verdict was offline
    #[arg(long)]
    failed: bool,

    /// Check only sites registered under given domain
    #[arg(long)]
    domain: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Amount of sites checked in parallel
    #[arg(long)]
    concurrency: Option<usize>,
}


impl Cli {
    /// Sites to go through. Failed sites win over a domain.
    fn selection(&self) -> Selection {
        match (&self.domain, self.failed) {
            (Some(domain), true) => {
                warn!("Both --failed and --domain={} given. Checking failed sites only.", domain);
                Selection::Failed
            }
            (None, true) => Selection::Failed,
            (Some(domain), false) => Selection::Domain(domain.clone()),
            (None, false) => Selection::All,
        }
    }
}


/// Logs go to stderr, RUST_LOG wins over configured level
fn setup_logger(level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .init();
}


/// Run the sweep through actors, wait until the reporter drained its mailbox
async fn sweep(cli: &Cli, config: &Config) -> Result<SweepReport, SweepError> {
    let store = FileStore::open(config.get_sites_dir())?;
    let transport = CurlTransport::new(
        config.get_timeout(),
        config.get_connection_timeout(),
        config.user_agent.clone(),
    );

    let reporter = SyncArbiter::start(1, Reporter::default);
    let sweeper = Sweeper::new(Arc::new(store), Arc::new(transport), Arc::new(reporter.clone()))
        .with_concurrency(cli.concurrency.unwrap_or_else(|| config.get_concurrency()))
        .with_keyword_policy(config.get_keyword_policy());
    let sweeper = SyncArbiter::start(1, move || sweeper.clone());

    let report = sweeper
        .send(Sweep(cli.selection()))
        .await
        .map_err(|err| SweepError::Actor(err.to_string()))??;
    let reported = reporter
        .send(Flush)
        .await
        .map_err(|err| SweepError::Actor(err.to_string()))?;
    debug!("Reporter received {} progress records", reported.evaluated);
    Ok(report)
}


#[actix_macros::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());
    setup_logger(
        config
            .as_ref()
            .map(Config::get_log_level)
            .unwrap_or(LevelFilter::INFO),
    );
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting Sitecheck v{}", env!("CARGO_PKG_VERSION"));
    let start = Local::now();
    match sweep(&cli, &config).await {
        Ok(report) => {
            info!(
                "Checks took: {}s. Evaluated: {}, online: {}, offline: {}, fresh: {}, unsaved: {}.",
                (Local::now() - start).num_seconds(),
                report.evaluated,
                report.online,
                report.offline(),
                report.fresh,
                report.unsaved
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
