use anyhow::{Context, Result};
use football_fixtures::scheduler::run_scheduler;
use football_fixtures::web::{router, AppState};
use football_fixtures::{build_job_runner, init_tracing, Config};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env().context("Invalid configuration")?;
    if config.llm.api_key.is_none() {
        warn!("OPENAI_API_KEY not set, /betslip will answer 503");
    }
    if config.jwt_secret.is_none() {
        warn!("JWT_SECRET not set, /betslip will reject every request");
    }

    let runner = Arc::new(build_job_runner(&config));
    tokio::spawn(run_scheduler(config.schedule.clone(), Arc::clone(&runner)));

    let app = router(Arc::new(AppState::new(runner, &config)));

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "Server running");
    println!("\nStarting web server at http://{}", addr);
    println!("Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
