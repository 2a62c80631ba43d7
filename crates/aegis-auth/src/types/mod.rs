//! Domain types shared across the engine.

pub mod token_record;
pub mod user;

pub use token_record::{REFRESH_SECRET_LEN, TokenRecord};
pub use user::User;
