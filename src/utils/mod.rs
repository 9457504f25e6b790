pub mod auth;
pub mod codes;
pub mod validate;

pub use auth::{create_token, hash_password, verify_password, verify_token, SessionRole, SESSION_HOURS};
pub use codes::next_code;
