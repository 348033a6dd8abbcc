pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod evaluator;
pub mod repositories;
pub mod scheduler;

pub use config::Config;
pub use db::create_pool;
pub use error::{AppError, Result};
