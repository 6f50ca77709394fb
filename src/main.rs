use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use telemirror::config::MirrorConfig;
use telemirror::error::{Error, TransportError};
use telemirror::mirror::{ActivityFilter, IdentityMap, MirrorPipeline, RateLimiter};
use telemirror::store::{LibSqlBackend, MirrorStore};
use telemirror::supervisor::Supervisor;
use telemirror::text::UrlStripper;
use telemirror::transport::{TelegramTransport, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing: RUST_LOG, then LOG_LEVEL, then info
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| {
            std::env::var("LOG_LEVEL")
                .ok()
                .filter(|level| !level.trim().is_empty())
                .and_then(|level| EnvFilter::try_new(level).ok())
        })
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = MirrorConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export TELEGRAM_BOT_TOKEN=123456:ABC-...");
        std::process::exit(1);
    });

    eprintln!("📡 Telemirror v{}", env!("CARGO_PKG_VERSION"));
    match config.target {
        Some(target) => eprintln!("   Target: {target}"),
        None => eprintln!("   Target: none (filter-only mode)"),
    }
    eprintln!(
        "   Activity: {:?} (folder \"{}\", refresh every {}s)",
        config.activity.policy,
        config.activity.folder,
        config.activity.refresh_interval.as_secs()
    );
    eprintln!(
        "   Rate limit: {} sends, then {}ms pause",
        config.rate_limit.limit,
        config.rate_limit.cooldown.as_millis()
    );

    // ── Database ─────────────────────────────────────────────────────────
    let store = LibSqlBackend::new_local(&config.database_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_path.display()))?;
    let recorded = store.count_mirrors().await.context("failed to read mirror records")?;
    eprintln!(
        "   Database: {} ({recorded} mirror records)",
        config.database_path.display()
    );
    let identity = IdentityMap::new(Arc::new(store));

    // ── Engine ───────────────────────────────────────────────────────────
    let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(config.telegram.clone()));
    let activity = Arc::new(ActivityFilter::new(
        Arc::clone(&transport),
        config.activity.policy,
        config.activity.folder.clone(),
    ));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.limit,
        config.rate_limit.cooldown,
    ));

    let mut pipeline = MirrorPipeline::new(
        Arc::clone(&transport),
        Arc::clone(&activity),
        identity,
        limiter,
        config.target,
    );
    if config.remove_urls {
        eprintln!(
            "   URL removal: on (kept: {})",
            if config.url_whitelist.is_empty() {
                "none".to_string()
            } else {
                config.url_whitelist.join(", ")
            }
        );
        pipeline = pipeline.with_url_stripper(UrlStripper::new(config.url_whitelist.clone()));
    }
    eprintln!();

    let supervisor = Supervisor::new(
        transport,
        activity,
        Arc::new(pipeline),
        config.activity.refresh_interval,
    );

    match supervisor.run().await {
        Ok(_) => Ok(()),
        Err(Error::Transport(e @ TransportError::AuthFailed { .. })) => {
            tracing::error!(error = %e, "Not authorized, exiting");
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
