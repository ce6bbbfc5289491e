//! Refresh token records and their persistence.

mod models;
mod repository;

pub use models::RefreshTokenRecord;
pub use repository::RefreshTokenRepository;
