//! Built-in gate stages.

pub mod expiration;
pub mod password;
pub mod view_limit;

pub use expiration::ExpirationStage;
pub use password::PasswordStage;
pub use view_limit::ViewLimitStage;
