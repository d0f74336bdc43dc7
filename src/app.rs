/*
 * Responsibility
 * - Tracing + panic hook setup
 * - Config -> AppState -> Router
 * - Housekeeping task (token pruning, idle rate-limit buckets)
 * - Bind (fatal on failure) and serve until the shutdown signal has drained
 */
use std::{panic, process, time::Duration};

use anyhow::Result;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::build_router;
use crate::config::Config;
use crate::lifecycle::{self, Phase, Server};
use crate::state::AppState;

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,securecloud_gateway=debug LOG_FORMAT=json cargo run
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get lost when stderr is hidden.
        tracing::error!(?info, "panic");

        // Development: fail fast. Production: default behavior, the server keeps running.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

/// Periodically drops expired revocations, refresh records and idle rate-limit
/// buckets. Exits once the lifecycle reaches `Stopped`.
pub fn spawn_housekeeping(state: AppState, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let stopped = state.lifecycle.reached(Phase::Stopped);
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                _ = &mut stopped => break,
                _ = ticker.tick() => {
                    match state.tokens.prune(chrono::Utc::now()).await {
                        Ok(report) => debug!(
                            revocations = report.revocations,
                            issued = report.issued,
                            refresh_tokens = report.refresh_tokens,
                            "pruned expired tokens"
                        ),
                        Err(e) => warn!(error = %e, "token pruning failed"),
                    }
                    let buckets = state.limiter.cleanup(std::time::Instant::now());
                    debug!(buckets, "pruned idle rate limit buckets");
                }
            }
        }
        debug!("housekeeping stopped");
    })
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    info!(
        env = ?config.app_env,
        addr = %config.addr,
        rate_limit = ?config.rate_limit,
        "starting gateway"
    );

    let state = AppState::from_config(&config).await?;
    let housekeeping = spawn_housekeeping(state.clone(), HOUSEKEEPING_INTERVAL);

    let router = build_router(state.clone(), &config);
    let listener = lifecycle::bind(config.addr).await?;
    info!(addr = %config.addr, "listening");

    let outcome = Server::new(state.lifecycle.clone(), config.drain_deadline)
        .serve(listener, router, lifecycle::shutdown_signal())
        .await;

    let _ = housekeeping.await;
    info!(?outcome, "gateway stopped");
    Ok(())
}
