pub mod election_repository;
pub mod option_repository;
pub mod payment_repository;
pub mod user_repository;
pub mod vote_repository;

pub use election_repository::*;
pub use option_repository::*;
pub use payment_repository::*;
pub use user_repository::*;
pub use vote_repository::*;
