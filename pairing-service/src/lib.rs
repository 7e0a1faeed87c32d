pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::State,
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    tracing::{request_id, request_id_middleware},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, PairingConfig, SwaggerMode};
use crate::services::{
    CacheStore, CodeStore, JwtService, LockManager, PairingCodeCache, SessionService, StoreHealth,
    TokenIssuer, TokenRefresher, TokenRepository, TokenValidator, TvPairingService, UserDirectory,
};
use service_core::error::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::tv::generate_tv_code,
        handlers::tv::poll_tv_code,
        handlers::tv::activate_tv_code,
        handlers::token::login,
        handlers::token::refresh,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::tv::GenerateCodeRequest,
            dtos::tv::GenerateCodeResponse,
            dtos::tv::PollCodeRequest,
            dtos::tv::PollCodeResponse,
            dtos::tv::ActivateCodeRequest,
            dtos::tv::ActivateCodeResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::RefreshRequest,
            dtos::auth::RefreshResponse,
            services::TokenBundle,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "TV Pairing", description = "Pair a TV with a signed-in account through a short code"),
        (name = "Tokens", description = "Password login and access token rotation"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Storage, cache and lock backends the services run on.
#[derive(Clone)]
pub struct Backends {
    pub users: Arc<dyn UserDirectory>,
    pub codes: Arc<dyn CodeStore>,
    pub tokens: Arc<dyn TokenRepository>,
    pub store: Arc<dyn StoreHealth>,
    pub cache: Arc<dyn CacheStore>,
    pub locks: Arc<dyn LockManager>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: PairingConfig,
    pub pairing: TvPairingService,
    pub sessions: SessionService,
    pub refresher: TokenRefresher,
    pub validator: TokenValidator,
    pub store: Arc<dyn StoreHealth>,
    pub cache: Arc<dyn CacheStore>,
    pub login_rate_limiter: IpRateLimiter,
    pub poll_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wires the services onto `backends`.
    pub fn new(config: PairingConfig, jwt: JwtService, backends: Backends) -> Self {
        let issuer = TokenIssuer::new(jwt.clone(), backends.tokens.clone(), config.tokens.clone());

        let pairing = TvPairingService::new(
            backends.users.clone(),
            backends.codes.clone(),
            PairingCodeCache::new(backends.cache.clone()),
            backends.locks.clone(),
            issuer.clone(),
            &config.tv_code,
        );
        let sessions = SessionService::new(backends.users.clone(), issuer.clone());
        let refresher = TokenRefresher::new(issuer, backends.tokens.clone(), backends.users.clone());
        let validator =
            TokenValidator::new(jwt, backends.tokens.clone(), config.tokens.client_name.clone());

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let poll_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.poll_attempts,
            config.rate_limit.poll_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        Self {
            config,
            pairing,
            sessions,
            refresher,
            validator,
            store: backends.store,
            cache: backends.cache,
            login_rate_limiter,
            poll_rate_limiter,
            ip_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let login_route = Router::new()
        .route("/api/login", post(handlers::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    // TVs poll in a loop, so the poll route gets its own tighter limiter
    let poll_route = Router::new()
        .route("/api/poll-tv-code", post(handlers::poll_tv_code))
        .layer(from_fn_with_state(
            state.poll_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let activate_route = Router::new()
        .route("/api/active-tv-code", post(handlers::activate_tv_code))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::bearer_auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics));

    let swagger_enabled = match state.config.environment {
        Environment::Dev => true,
        Environment::Prod => matches!(state.config.swagger.enabled, SwaggerMode::Public),
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let allowed_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    app.route("/api/generate-tv-code", post(handlers::generate_tv_code))
        .route("/api/refresh", post(handlers::refresh))
        .merge(login_route)
        .merge(poll_route)
        .merge(activate_route)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id(request),
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Postgres or Redis is unreachable", body = ErrorResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Postgres health check failed");
        AppError::from(e)
    })?;

    state.cache.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Redis health check failed");
        AppError::InternalError(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgres": "up",
            "redis": "up"
        }
    })))
}
