use sidequest_database::Database;

pub mod error;
pub mod session;

pub use error::ProgressionError;
pub use session::{AuthSession, UserId};

/// Shared handles passed to every operation.
#[derive(Clone, Debug)]
pub struct Data {
    pub db: Database,
}
