pub mod account;
pub mod password_reset_record;

pub use account::Account;
pub use password_reset_record::PasswordResetRecord;
