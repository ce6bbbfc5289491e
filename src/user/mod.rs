//! User records and their persistence.

mod models;
mod repository;

pub use models::{NewUser, User, UserView};
pub use repository::{UserRepository, is_unique_violation};
