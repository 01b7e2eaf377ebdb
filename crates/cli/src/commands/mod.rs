pub mod auth;
pub mod pick;
pub mod repo;
pub mod review;
pub mod user;
pub mod utils;
