pub mod factory;
pub mod otp;
pub mod role;
pub mod token;

pub use factory::build_token_service;
pub use role::{Role, RolePolicy};
pub use token::{TokenError, TokenService, VerifiedToken};
