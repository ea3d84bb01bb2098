//! Authorization gate.
//!
//! - [`JwtService`] issues and validates bearer credentials
//! - [`password`] hashes and verifies account passwords
//! - [`require_auth`] resolves a credential to a [`CurrentUser`]
//! - [`CurrentUser`] carries the role-set and restaurant-binding checks

pub mod current_user;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use current_user::CurrentUser;
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
