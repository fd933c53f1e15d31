pub mod codec;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo::{PgTokenRepo, TokenRepo};
pub use repo_types::{Token, TokenScope};
pub use services::TokenService;
