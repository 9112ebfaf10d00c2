pub mod chunks;
pub mod db;
pub mod escalations;
pub mod models;
pub mod profiles;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
