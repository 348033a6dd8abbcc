pub mod devices;
pub mod savings;
pub mod users;

pub use devices::DevicesRepository;
pub use savings::SavingsRepository;
pub use users::UsersRepository;
