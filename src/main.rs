// eventforge - cost-aware event title and description generator
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use eventforge::cli::{Args, Command, EventArgs};
use eventforge::config::AppConfig;
use eventforge::generation::Orchestrator;
use eventforge::models::{GenerationRequest, RequestBuilder};
use eventforge::policy::{profile_for, CostMode};
use eventforge::provider::OpenAiClient;
use eventforge::server::create_router;
use eventforge::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting eventforge v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build provider client
    let client = OpenAiClient::new(&config.provider)?;
    info!("Using provider at {}", config.provider.api_base_url);

    // Phase 4: Build orchestrator
    let orchestrator = Arc::new(Orchestrator::from_config(Arc::new(client), &config));
    let default_mode = config.default_mode()?;

    match args.command {
        Command::Serve => serve(config, orchestrator).await,
        Command::Titles { event, count } => {
            let builder = GenerationRequest::titles(&event.category, &event.event_type, &event.tone)
                .count(count);
            let request = finish_request(builder, event, default_mode)?;
            let result = orchestrator.generate(&request).await?;

            for warning in &result.warnings {
                warn!("{}", warning);
            }
            for title in result.titles() {
                println!("{}", title);
            }
            Ok(())
        }
        Command::Describe {
            title,
            event,
            max_chars,
        } => {
            let builder =
                GenerationRequest::description(title, &event.category, &event.event_type, &event.tone)
                    .max_chars(max_chars);
            let request = finish_request(builder, event, default_mode)?;
            let result = orchestrator.generate(&request).await?;

            for warning in &result.warnings {
                warn!("{}", warning);
            }
            println!("{}", result.content);
            Ok(())
        }
    }
}

fn finish_request(
    builder: RequestBuilder,
    event: EventArgs,
    default_mode: CostMode,
) -> Result<GenerationRequest> {
    let mode = match event.mode.as_deref() {
        Some(mode) => profile_for(mode)?.mode,
        None => default_mode,
    };

    Ok(builder
        .maybe_context(event.context)
        .tags(event.tags)
        .mode(mode)
        .build())
}

async fn serve(config: AppConfig, orchestrator: Arc<Orchestrator>) -> Result<()> {
    // Phase 5: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(config, orchestrator)?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
