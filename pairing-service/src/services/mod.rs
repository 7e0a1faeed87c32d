//! Services layer for pairing-service.
//!
//! Pairing code lifecycle, token issuance and rotation, and the storage,
//! cache and lock backends they run on.

pub mod cache;
pub mod code_generator;
mod database;
pub mod error;
mod jwt;
pub mod lock;
mod memory;
pub mod metrics;
pub mod pairing;
pub mod redis;
pub mod repository;
mod session;
mod token_issuer;
mod token_refresher;
mod token_validator;

pub use cache::{CacheStore, MemoryCache, PairingCodeCache};
pub use code_generator::CodeGenerator;
pub use database::Database;
pub use error::ServiceError;
pub use jwt::{AccessTokenClaims, JwtService};
pub use lock::{with_lock, InMemoryLockManager, LockBudget, LockManager};
pub use memory::MemoryDatabase;
pub use pairing::{ActivationOutcome, GeneratedCode, PollOutcome, TvPairingService};
pub use redis::RedisService;
pub use repository::{CodeStore, StoreHealth, TokenRepository, UserDirectory};
pub use session::SessionService;
pub use token_issuer::{IssuedTokens, TokenBundle, TokenIssuer, DEFAULT_SCOPES};
pub use token_refresher::TokenRefresher;
pub use token_validator::{AuthenticatedUser, TokenValidator};
