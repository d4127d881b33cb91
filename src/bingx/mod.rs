pub mod auth;
pub mod client;
pub mod types;

pub use auth::BingxAuth;
pub use client::{BingxClient, BingxError};
