//! fxtg - Telegram-friendly previews for social media posts.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fxtg::{
    cache::{spawn_sweeper, TtlCache},
    config::Config,
    post::HttpExtractor,
    proxy::{HttpUpstream, MediaProxy},
    server::{create_router, AppState, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    run_serve(config).await
}

// =============================================================================
// Serve
// =============================================================================

async fn run_serve(config: Config) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let base_url = config.public_base_url();

    info!("fxtg v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Base URL: {}", base_url);
    info!("  Origin: {}", config.origin_url);
    info!(
        "  Cache: {} (window {}s, sweep every {}s)",
        config.cache_file.display(),
        config.cache_window,
        config.cache_sweep_interval
    );
    info!("  Mosaic width: {}px", config.mosaic_width);

    // Load the persistent cache; a corrupt file is fatal
    let cache = match TtlCache::load(&config.cache_file).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("  Cache entries loaded: {}", cache.len().await);

    // Build the proxy
    let whitelist = match config.whitelist() {
        Ok(whitelist) => whitelist,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let upstream = match HttpUpstream::new() {
        Ok(upstream) => Arc::new(upstream),
        Err(e) => {
            error!("Failed to build upstream client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let proxy = MediaProxy::new(upstream, whitelist);

    let mut state = AppState::new(Arc::clone(&cache), proxy, base_url.clone())
        .with_origin_url(config.origin_url.clone())
        .with_mosaic_width(config.mosaic_width);

    // Preview route needs an extractor
    match config.extractor_url() {
        Ok(Some(endpoint)) => match HttpExtractor::new(endpoint.clone()) {
            Ok(extractor) => {
                info!("  Extractor: {}", endpoint);
                state = state.with_extractor(Arc::new(extractor));
            }
            Err(e) => {
                error!("Failed to build extractor client: {}", e);
                return ExitCode::FAILURE;
            }
        },
        Ok(None) => {
            warn!("  Extractor: not configured - preview route DISABLED");
            warn!("        Enable with --extractor-url=<url> or FXTG_EXTRACTOR_URL");
        }
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    // Start the sweeper
    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        Arc::clone(&cache),
        config.cache_window(),
        config.sweep_interval(),
        shutdown.clone(),
    );

    let router = create_router(state, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -A Telegram {}/<username>/post/<post_id>", base_url);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            shutdown.cancel();
            return ExitCode::FAILURE;
        }
    };

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop the sweeper before the final flush so the file ends at the latest state
    shutdown.cancel();
    if let Err(e) = sweeper.await {
        warn!("Cache sweeper did not stop cleanly: {}", e);
    }

    let mut exit = ExitCode::SUCCESS;

    if let Err(e) = served {
        error!("Server error: {}", e);
        exit = ExitCode::FAILURE;
    }

    match cache.save().await {
        Ok(()) => info!("Cache flushed to {}", cache.path().display()),
        Err(e) => {
            error!("{}", e);
            exit = ExitCode::FAILURE;
        }
    }

    exit
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "fxtg=debug,tower_http=debug"
    } else {
        "fxtg=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Apply tracing setting
    router_config.with_tracing(!config.no_tracing)
}
