pub mod connection;
pub mod models;
pub mod repositories;

pub use connection::*;
pub use models::*;
