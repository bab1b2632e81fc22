use pulseboard_client::{DashboardClient, EventSubscriber, SubscriberConfig};
use pulseboard_core::model::DashboardEvent;
use pulseboard_core::store::MemoryStore;
use pulseboard_core::{CoreConfig, Pulseboard};
use pulseboard_server::{router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,pulseboard_core=info,console_demo=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        target: "console_demo",
        "Starting console demo: server + subscriber + simulated deployment"
    );

    // In-memory store; every read is backed by the synthetic fallback
    let mut config = CoreConfig::from_env();
    config.refresh_interval = Duration::from_secs(2);
    let mut board = Pulseboard::new(config, MemoryStore::new());
    board.start();

    // 1) HTTP server on an ephemeral port
    let state = AppState {
        hub: Arc::clone(&board.hub),
        source: Arc::clone(&board.source),
        deployer: Arc::clone(&board.deployer),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(state)).await {
            warn!(target: "console_demo", error = %e, "Server exited");
        }
    });
    info!(target: "console_demo", url = %format!("http://{addr}"), "Dashboard API up");

    // 2) Typed client + live subscriber against our own server
    let client = DashboardClient::new(format!("http://{addr}"));
    let mut events = EventSubscriber::new(client.clone(), SubscriberConfig::default()).start();

    // 3) Print every dashboard event as it arrives
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                DashboardEvent::MetricsUpdate(m) => {
                    info!(
                        target: "console_demo",
                        cpu = m.cpu,
                        memory = m.memory,
                        latency = m.latency,
                        "📊 metrics:update"
                    );
                }
                DashboardEvent::LogNew(l) => {
                    info!(
                        target: "console_demo",
                        level = l.level.as_str(),
                        service = %l.service,
                        "📝 {}", l.message
                    );
                }
                DashboardEvent::LogsUpdate(ls) => {
                    info!(target: "console_demo", count = ls.len(), "📝 logs:update (poll)");
                }
                DashboardEvent::DeploymentStarted(d) => {
                    info!(
                        target: "console_demo",
                        deployment = %d.id,
                        branch = %d.branch,
                        "🚀 deployment:started"
                    );
                }
                DashboardEvent::DeploymentProgress(p) => {
                    info!(
                        target: "console_demo",
                        deployment = %p.id,
                        stage = p.stage.as_str(),
                        "⏳ {}", p.message
                    );
                }
                DashboardEvent::DeploymentComplete(o) => {
                    info!(
                        target: "console_demo",
                        deployment = %o.id,
                        status = ?o.status,
                        "🏁 {}", o.message
                    );
                }
            }
        }
    });

    // 4) Kick off one simulated deployment
    let response = client.trigger_deploy(Some("main")).await?;
    info!(
        target: "console_demo",
        deployment = %response.deployment.id,
        "{}", response.message
    );

    info!(target: "console_demo", "Running; Ctrl-C to stop");
    signal::ctrl_c().await?;

    printer.abort();
    board.shutdown().await;
    info!(target: "console_demo", "Demo stopped");
    Ok(())
}
