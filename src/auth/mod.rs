pub mod password;
pub mod tokens;

pub use password::PasswordHasher;
pub use tokens::{JwtClaims, TokenError, TokenService};
