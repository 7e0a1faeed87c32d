pub mod password;
pub mod validation;

pub use password::{hash_password, verify_password, Password};
pub use validation::ValidatedJson;

use chrono::{DateTime, Utc};
use rand::RngCore;

/// Wire format for every timestamp the API returns, e.g. `2025-02-09 14:30:53`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a UTC instant as `YYYY-MM-DD HH:MM:SS`.
pub fn to_date_time_string(instant: DateTime<Utc>) -> String {
    instant.format(DATE_TIME_FORMAT).to_string()
}

/// `len` bytes from the thread-local CSPRNG, hex encoded.
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_time_string() {
        let instant = Utc.with_ymd_and_hms(2025, 2, 9, 14, 30, 53).unwrap();
        assert_eq!(to_date_time_string(instant), "2025-02-09 14:30:53");
    }

    #[test]
    fn test_random_hex_length() {
        assert_eq!(random_hex(32).len(), 64);
        assert_eq!(random_hex(40).len(), 80);
        assert_ne!(random_hex(32), random_hex(32));
    }
}
