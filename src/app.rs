/*
 * Responsibility
 * - Config -> collaborators -> Router assembly
 * - Global middleware (request id/trace/timeout, CORS, security headers)
 * - Background OTP sweep, then axum::serve()
 */
use std::sync::Arc;
use std::time::Duration;
use std::{panic, process};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::{Config, StoreBackend};
use crate::error::AppError;
use crate::middleware::{cors, http, security_headers};
use crate::repos::memory::MemoryStore;
use crate::repos::pg::PgDocumentStore;
use crate::repos::store::DocumentStore;
use crate::services::auth::build_token_service;
use crate::services::cache::{CacheClient, MemoryCache, ValkeyClient};
use crate::services::content::{DisabledGenerator, HttpResourceGenerator, ResourceGenerator};
use crate::services::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::services::sweep;
use crate::state::{AppState, OtpSettings};

const GENERATOR_TIMEOUT: Duration = Duration::from_secs(20);
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("loading configuration")?;
    init_panic_hook(!config.app_env.is_production());
    tracing::info!(config = ?config, "configuration loaded");

    let state = build_state(&config).await?;
    tracing::info!(state = ?state, "collaborators ready");

    let sweeper = sweep::spawn(state.store.clone(), config.otp_sweep_interval);
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    tracing::info!(addr = %config.addr, env = ?config.app_env, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing() {
    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the process. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

pub async fn build_state(config: &Config) -> Result<AppState> {
    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            Arc::new(
                PgDocumentStore::connect(url, config.database_max_connections, config.store_timeout)
                    .await
                    .context("connecting to postgres")?,
            )
        }
    };

    let cache: Arc<dyn CacheClient> = match config.valkey_url.as_deref() {
        Some(url) => Arc::new(
            ValkeyClient::connect(url)
                .await
                .context("connecting to valkey")?,
        ),
        None => {
            tracing::warn!("VALKEY_URL unset; OTP throttling is per-process only");
            Arc::new(MemoryCache::new())
        }
    };

    let generator: Arc<dyn ResourceGenerator> = match &config.content_generator_url {
        Some(url) => Arc::new(
            HttpResourceGenerator::new(
                url.clone(),
                config.content_generator_api_key.clone(),
                GENERATOR_TIMEOUT,
            )
            .context("building content generator client")?,
        ),
        None => Arc::new(DisabledGenerator),
    };

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(
            WebhookNotifier::new(url.clone(), NOTIFY_TIMEOUT)
                .context("building notification client")?,
        ),
        None => Arc::new(LogNotifier),
    };

    Ok(AppState {
        store,
        tokens: build_token_service(config),
        cache,
        generator,
        notifier,
        otp: OtpSettings {
            ttl: Duration::from_secs(config.otp_ttl_seconds),
            resend_interval: Duration::from_secs(config.otp_resend_seconds),
        },
    })
}

async fn route_not_found() -> AppError {
    AppError::not_found("route")
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(state.clone()))
        .fallback(route_not_found)
        .with_state(state);

    let router = http::apply(router, http::HttpLimits::default());
    let router = cors::apply(router, config);
    security_headers::apply(router)
}
