//! Membership service binary.
//!
//! Wires the adapters to their ports and serves the HTTP API:
//!
//! 1. Load and validate configuration from the environment
//! 2. Initialize tracing (JSON output in production)
//! 3. Connect PostgreSQL and run embedded migrations
//! 4. Build the payment provider, event bus, and rate limiter
//! 5. Serve the axum router until SIGTERM or Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use nosmoke::adapters::auth::{JwtConfig, JwtSessionValidator};
use nosmoke::adapters::events::{EventLogger, InMemoryEventBus};
use nosmoke::adapters::http::middleware::{
    auth_middleware, rate_limit_middleware, AuthState, RateLimiterState,
};
use nosmoke::adapters::http::{health_routes, membership_router, MembershipAppState};
use nosmoke::adapters::payment::{MockPaymentProvider, ZaloPayAdapter, ZaloPayConfig};
use nosmoke::adapters::postgres::{PostgresMembershipReader, PostgresMembershipRepository};
use nosmoke::adapters::rate_limiter::{
    InMemoryRateLimiter, RateLimitConfig, RedisRateLimiter, TierSyncHandler,
};
use nosmoke::config::{AppConfig, ServerConfig};
use nosmoke::ports::PaymentProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        "Starting membership service"
    );

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let event_bus = Arc::new(InMemoryEventBus::new());
    let _audit_log = EventLogger::subscribe_membership_events(event_bus.as_ref());

    let payment_provider = build_payment_provider(&config);

    let rate_limiter = build_rate_limiter(&config, event_bus.as_ref()).await?;

    let session_validator: AuthState = Arc::new(JwtSessionValidator::new(JwtConfig::new(
        config.auth.jwt_secret.expose_secret().clone(),
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
    )));

    let app_state = MembershipAppState {
        membership_repository: Arc::new(PostgresMembershipRepository::new(pool.clone())),
        membership_reader: Arc::new(PostgresMembershipReader::new(pool.clone())),
        payment_provider,
        event_publisher: event_bus.clone(),
    };

    // Auth runs outside rate limiting so per-user quotas see the principal.
    // Health stays outside both.
    let api = membership_router()
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            session_validator,
            auth_middleware,
        ))
        .with_state(app_state);

    let app = Router::new()
        .nest("/api", api)
        .merge(health_routes())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(build_cors(&config.server))
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(config.server.request_timeout())),
        );

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Env filter from `RUST_LOG` when set, otherwise the configured default.
/// Production emits JSON lines for the log pipeline.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_payment_provider(config: &AppConfig) -> Arc<dyn PaymentProvider> {
    if config.payment.use_mock {
        tracing::warn!("Using mock payment provider, orders never reach the gateway");
        return Arc::new(MockPaymentProvider::new());
    }

    let mut gateway_config = ZaloPayConfig::new(
        config.payment.app_id.clone(),
        config.payment.key1.expose_secret().clone(),
        config.payment.key2.expose_secret().clone(),
    )
    .with_endpoint(config.payment.endpoint.clone());

    if let Some(url) = &config.payment.callback_url {
        gateway_config = gateway_config.with_callback_url(url.clone());
    }

    tracing::info!(
        sandbox = gateway_config.is_sandbox(),
        "Payment gateway: ZaloPay"
    );
    Arc::new(ZaloPayAdapter::new(gateway_config))
}

/// Redis-backed when a URL is configured, per-process in-memory otherwise.
/// Either way the limiter subscribes to membership events so quota tiers
/// track upgrades.
async fn build_rate_limiter(
    config: &AppConfig,
    event_bus: &InMemoryEventBus,
) -> Result<RateLimiterState, Box<dyn std::error::Error>> {
    let limits = RateLimitConfig::default();

    let limiter: RateLimiterState = match &config.redis.url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let conn = tokio::time::timeout(
                config.redis.timeout(),
                client.get_multiplexed_tokio_connection(),
            )
            .await??;
            tracing::info!("Rate limiting backed by Redis");

            let limiter = RedisRateLimiter::new(conn, limits);
            TierSyncHandler::subscribe_membership_events(Arc::new(limiter.clone()), event_bus);
            Arc::new(limiter)
        }
        None => {
            tracing::info!("Rate limiting in-memory (single instance)");
            let limiter = Arc::new(InMemoryRateLimiter::new(limits));
            TierSyncHandler::subscribe_membership_events(limiter.clone(), event_bus);
            limiter
        }
    };

    Ok(limiter)
}

/// Explicit origins when configured, permissive otherwise (development).
fn build_cors(server: &ServerConfig) -> CorsLayer {
    let configured = server.cors_origins_list();
    if configured.is_empty() {
        return CorsLayer::permissive();
    }

    let mut origins = Vec::new();
    for origin in configured {
        match origin.parse::<HeaderValue>() {
            Ok(value) => origins.push(value),
            Err(_) => tracing::warn!(%origin, "Ignoring invalid CORS origin"),
        }
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
