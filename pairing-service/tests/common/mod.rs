//! Shared harness for pairing-service integration tests.
//!
//! Builds the full router on the in-memory backends, with the signing key
//! read from a temporary file the way `main` reads it in production.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use pairing_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, JwtConfig, PairingConfig, RateLimitConfig, RedisConfig,
        SecurityConfig, SwaggerConfig, SwaggerMode, TokenConfig, TvCodeConfig,
    },
    models::{OAuthClient, User},
    services::{
        InMemoryLockManager, JwtService, MemoryCache, MemoryDatabase, TokenBundle, TokenIssuer,
    },
    utils::{hash_password, Password},
    AppState, Backends,
};
use secrecy::Secret;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

pub const TEST_SIGNING_KEY: &str = "pairing-service-test-signing-key\n";
pub const TEST_ISSUER: &str = "http://localhost:8080";
pub const TEST_EMAIL: &str = "viewer@example.com";
pub const TEST_PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: Arc<MemoryDatabase>,
    pub cache: Arc<MemoryCache>,
    pub issuer: TokenIssuer,
    pub user: User,
    _key_file: NamedTempFile,
}

pub fn test_config(signing_key_path: &str) -> PairingConfig {
    PairingConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "pairing-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://localhost/pairing_test".to_string()),
            max_connections: 5,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
        },
        jwt: JwtConfig {
            signing_key_path: signing_key_path.to_string(),
            issuer: TEST_ISSUER.to_string(),
        },
        tokens: TokenConfig::default(),
        tv_code: TvCodeConfig::default(),
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
        rate_limit: RateLimitConfig::default(),
    }
}

impl TestApp {
    /// App with one registered user, who can log in with `TEST_PASSWORD`,
    /// and the OAuth client provisioned.
    pub fn spawn() -> Self {
        Self::spawn_with(|_| {})
    }

    pub fn spawn_with(customise: impl FnOnce(&mut PairingConfig)) -> Self {
        let mut key_file = NamedTempFile::new().expect("Failed to create key file");
        key_file
            .write_all(TEST_SIGNING_KEY.as_bytes())
            .expect("Failed to write key file");

        let mut config = test_config(key_file.path().to_str().expect("Non UTF-8 temp path"));
        customise(&mut config);

        let db = Arc::new(MemoryDatabase::new());
        let cache = Arc::new(MemoryCache::new());
        db.add_client(OAuthClient::new(config.tokens.client_name.clone()))
            .expect("Failed to add client");

        let password_hash = hash_password(&Password::new(TEST_PASSWORD.to_string()))
            .expect("Failed to hash password");
        let user = User::new(TEST_EMAIL.to_string(), Some("Viewer".to_string()))
            .with_password_hash(password_hash);
        db.add_user(user.clone()).expect("Failed to add user");

        let jwt = JwtService::new(&config.jwt).expect("Failed to create JWT service");
        let issuer = TokenIssuer::new(jwt.clone(), db.clone(), config.tokens.clone());

        let backends = Backends {
            users: db.clone(),
            codes: db.clone(),
            tokens: db.clone(),
            store: db.clone(),
            cache: cache.clone(),
            locks: Arc::new(InMemoryLockManager::new()),
        };
        let state = AppState::new(config, jwt, backends);
        let router = build_router(state.clone());

        TestApp {
            router,
            state,
            db,
            cache,
            issuer,
            user,
            _key_file: key_file,
        }
    }

    /// Registers another account.
    pub fn add_user(&self, email: &str) -> User {
        let user = User::new(email.to_string(), None);
        self.db.add_user(user.clone()).expect("Failed to add user");
        user
    }

    /// Signs in over HTTP and returns the token pair.
    pub async fn login(&self, email: &str, password: &str) -> TokenBundle {
        let (status, body) = self
            .post(
                "/api/login",
                serde_json::json!({ "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        serde_json::from_value(body["data"]["token"].clone()).expect("Malformed token bundle")
    }

    /// Token pair as the mobile app holds it after signing in.
    pub async fn mobile_token(&self, user: &User) -> TokenBundle {
        self.issuer
            .issue(user, &["mobile".to_string()])
            .await
            .expect("Failed to issue mobile token")
    }

    pub async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
        bearer: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        self.post_from(path, body, bearer, "203.0.113.10").await
    }

    /// POST with `x-forwarded-for` set to `ip`, so per-IP limits apply.
    pub async fn post_from(
        &self,
        path: &str,
        body: serde_json::Value,
        bearer: Option<&str>,
        ip: &str,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip);
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = request
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");

        self.send(request).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    /// Generates a code for `TEST_EMAIL` over HTTP.
    pub async fn generate_code(&self) -> String {
        let (status, body) = self
            .post(
                "/api/generate-tv-code",
                serde_json::json!({ "email": TEST_EMAIL }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "generate failed: {}", body);
        body["data"]["code"]
            .as_str()
            .expect("Missing code in response")
            .to_string()
    }
}
