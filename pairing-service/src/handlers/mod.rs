//! HTTP handlers for pairing-service.

pub mod metrics;
pub mod token;
pub mod tv;

pub use metrics::metrics;
pub use token::{login, refresh};
pub use tv::{activate_tv_code, generate_tv_code, poll_tv_code};
