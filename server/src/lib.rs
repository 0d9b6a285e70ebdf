pub mod access;
pub mod auth;
pub mod error;
pub mod folder;
pub mod handlers;
pub mod invitation;
pub mod observability;
pub mod router;
pub mod socket;
pub mod space;
pub mod state;
pub mod types;
pub mod workspace;

pub use error::AppError;
pub use state::{AppState, build_state};

#[cfg(test)]
pub mod test_support;
