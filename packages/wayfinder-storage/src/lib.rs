pub mod aliases;
pub mod cache;
pub mod db;
pub mod metrics;
pub mod models;
pub mod regions;
pub mod schema;
pub mod unresolved;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
