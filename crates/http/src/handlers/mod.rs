pub mod auth;
pub mod info;
pub mod payment;
pub mod user;
