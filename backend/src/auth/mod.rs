//! Authentication module for In-Paw-Dia
//!
//! Provides email/password authentication.
//! - Stateless access tokens, verified by signature and expiry only
//! - Refresh tokens tracked per user and rotated on every use
//! - bcrypt password hashing

mod jwt;
mod password;
mod service;

pub use jwt::{Claims, JwtError, TokenPayload, TokenService, TokenType};
pub use password::{hash_password, verify_password, PasswordError, DEFAULT_BCRYPT_COST};
pub use service::{normalize_email, AuthError, AuthService, AuthSession, IssuedTokens};
