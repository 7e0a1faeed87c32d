use chrono::{DateTime, Utc};
use rand::Rng;

use super::repository::CodeStore;
use super::ServiceError;

/// Number of digits in a pairing code.
pub const CODE_LENGTH: usize = 6;

/// Draws six-digit pairing codes that no currently valid code is using.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    max_attempts: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(10)
    }
}

impl CodeGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// A uniformly random zero-padded code, not checked against the store.
    pub fn draw() -> String {
        let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{:06}", code)
    }

    /// Draws until `store` reports the code free at `now`, giving up with
    /// `CodeSpaceExhausted` after `max_attempts` collisions. Nothing is
    /// persisted.
    pub async fn generate(
        &self,
        store: &dyn CodeStore,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        for attempt in 1..=self.max_attempts {
            let code = Self::draw();
            if !store.code_in_use(&code, now).await? {
                return Ok(code);
            }
            tracing::debug!(attempt, "Pairing code collision, drawing again");
        }

        tracing::error!(
            attempts = self.max_attempts,
            "Gave up looking for a free pairing code"
        );
        Err(ServiceError::CodeSpaceExhausted)
    }
}
