pub mod password_history;
pub mod role;
pub mod session;
pub mod tenant;
pub mod user;

pub use password_history::PasswordHistoryRepository;
pub use role::RoleRepository;
pub use session::SessionRepository;
pub use tenant::TenantRepository;
pub use user::UserRepository;
