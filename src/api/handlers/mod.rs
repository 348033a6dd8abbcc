pub mod auth;
pub mod devices;
pub mod health;
pub mod savings;
pub mod users;

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::repositories::{DevicesRepository, SavingsRepository, UsersRepository};

#[derive(Clone)]
pub struct AppState {
    pub devices_repository: Arc<DevicesRepository>,
    pub users_repository: Arc<UsersRepository>,
    pub savings_repository: Arc<SavingsRepository>,
    pub auth: AuthConfig,
}
