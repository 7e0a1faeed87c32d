pub mod access_token;
pub mod oauth_client;
pub mod pairing_code;
pub mod refresh_token;
pub mod user;

pub use access_token::AccessToken;
pub use oauth_client::OAuthClient;
pub use pairing_code::{PairingCode, PairingCodeState};
pub use refresh_token::RefreshToken;
pub use user::User;
