pub mod auth;
pub mod orders;
pub mod restaurants;
pub mod reviews;
pub mod users;
