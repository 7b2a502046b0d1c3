//! Authentication module
//!
//! Provides JWT bearer tokens and bcrypt password hashing. Authorization
//! inside a team is decided by `TeamRole`, not by the token.

mod jwt;
mod middleware;
mod password;

pub use jwt::{create_tokens, decode_token, refresh_tokens, Claims, TokenPair, TokenType};
pub use middleware::auth_middleware;
pub use password::{hash_password, verify_password};
