pub mod api;
pub mod auth;
pub mod betslip;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod utils;
pub mod web;

pub use api::{ApiFootballClient, OpenAiClient};
pub use config::Config;
pub use models::EnrichedFixture;
pub use pipeline::{FixturePipeline, JobRunner, RunError, RunOutcome};

use tracing_subscriber::EnvFilter;

/// Wire the upstream client and pipeline settings into a runner
pub fn build_job_runner(config: &Config) -> JobRunner {
    let client = ApiFootballClient::from_config(&config.api);
    JobRunner::new(FixturePipeline::new(client, config.pipeline.clone()))
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
