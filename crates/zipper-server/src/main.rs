//! Zipper Server - Main entry point

use anyhow::Result;
use axum::Router;
use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{error, info, warn};
use zipper_common::logging::{init_logging, LogConfig};

use zipper_server::{
    config::Config,
    features, middleware,
    notify::NotifierRegistry,
    pipeline::{ArchiveCommand, JobRunner, QueuePoller, WorkspaceManager},
    queue::{JobQueue, SqsQueue},
    storage::S3StoreFactory,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("zipper-server")
        .filter_directives("zipper_server=debug,zipper_common=debug,tower_http=debug,aws_smithy_runtime=warn")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    info!("Starting Zipper Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let queue: Arc<dyn JobQueue> = Arc::new(SqsQueue::new(&config.queue).await);

    // Read once; shared read-only by the API and every job
    let limits = queue.attributes().await?;
    info!(
        max_message_size = ?limits.max_message_size,
        max_receive_count = ?limits.max_receive_count,
        "Queue attributes loaded"
    );
    if limits.max_receive_count.is_none() {
        warn!("Queue has no redrive policy, failed jobs will be redelivered indefinitely");
    }

    let runner = JobRunner::new(
        queue.clone(),
        Arc::new(S3StoreFactory::new(config.storage.clone())),
        WorkspaceManager::new(&config.worker.workspace_root),
        ArchiveCommand::new(&config.worker.archive_program, config.worker.archive_args.clone()),
        NotifierRegistry::with_defaults(Duration::from_secs(config.worker.notify_timeout_secs))?,
        limits,
    )
    .with_visibility_timeout(Duration::from_secs(
        config.queue.visibility_timeout_secs.max(0) as u64,
    ));

    let mut poller = QueuePoller::new(
        queue.clone(),
        Arc::new(runner),
        &config.queue,
        config.worker.concurrency,
    )
    .start();
    info!("Queue poller started");

    let state = features::FeatureState {
        queue,
        limits: Arc::new(limits),
    };
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .into_future();

    tokio::select! {
        served = server => {
            poller.abort();
            served?;
            info!("Server shut down gracefully");
        },
        polled = &mut poller => {
            match polled {
                Ok(Ok(())) => warn!("Queue poller stopped"),
                Ok(Err(e)) => {
                    error!("Worker stopping after cleanup failure: {}", e);
                    return Err(e.into());
                },
                Err(e) => {
                    error!("Queue poller task failed: {}", e);
                    return Err(e.into());
                },
            }
        },
    }

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: features::FeatureState, config: &Config) -> Router {
    features::router(state, config.server.body_limit_bytes)
        // Apply layers from innermost to outermost
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // In-flight messages become visible again once their timeout lapses
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
