//! Credentials, bearer tokens, and the token guard that keeps them fresh.

pub mod guard;
pub mod secret;
pub mod token;

pub use guard::*;
pub use secret::*;
pub use token::*;
