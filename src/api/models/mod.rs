pub mod auth;
pub mod devices;
pub mod savings;
pub mod users;
