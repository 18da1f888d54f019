//! prompt-mcp server binary
//!
//! Configuration comes from the environment (see `prompt_core::Config`);
//! the protocol runs over stdio, so all logging goes to stderr or to
//! `LOG_FILE`.
//!
//! # Usage
//!
//! ```bash
//! PROMPT_REPO_URL=/abs/path/to/prompts prompt-mcp
//! ```

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use prompt_core::{Config, ReloadEngine, RuntimeStore, SourceManager, Transport};
use prompt_fs::FileCache;
use prompt_mcp::{DynamicToolRegistry, PromptMcpServer};
use prompt_meta::GroupFilter;

/// MCP server exposing a hot-reloading prompt catalogue
#[derive(Parser)]
#[command(name = "prompt-mcp")]
#[command(about = "MCP server exposing a hot-reloading prompt catalogue")]
#[command(version)]
struct Args {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Args {} = Args::parse();

    let config = Config::from_env()?;
    init_logging(&config)?;

    if config.transport != Transport::Stdio {
        tracing::warn!(
            transport = config.transport.as_str(),
            "transport not wired in this build, serving stdio"
        );
    }

    tracing::info!(
        sources = config.repo_urls.len(),
        storage = ?config.storage_dir,
        watch_mode = config.watch_mode,
        language = config.language.as_str(),
        "starting prompt-mcp"
    );

    let cache = FileCache::new();
    let manager = Arc::new(SourceManager::from_config(&config, cache.clone())?);
    manager.initial_load()?;

    let registry = Arc::new(DynamicToolRegistry::new());
    let store = Arc::new(RuntimeStore::new());
    let filter = GroupFilter::new(config.groups.clone(), config.has_system_source());
    let engine = ReloadEngine::new(
        manager,
        registry.clone(),
        store,
        cache.clone(),
        filter,
        config.language,
    );

    let report = engine.full_reload().await?;
    tracing::info!(
        loaded = report.loaded,
        errors = report.errors.len(),
        "initial load complete"
    );

    let server = PromptMcpServer::new(config.clone(), engine.clone(), registry);

    if config.watch_mode {
        server
            .state()
            .watchers
            .start(&engine, config.git_polling_interval)?;
    }
    if let Some(interval) = config.cache_cleanup_interval {
        cache.start_sweeper(interval);
    }

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    // Release scoped resources, then wait out any in-flight reload.
    server.state().watchers.stop();
    cache.stop_sweeper();
    engine.quiesce().await;
    tracing::info!("shutdown complete");
    Ok(())
}

fn init_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let default_level = config.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        // stdout carries the protocol, logs go to stderr
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
