pub mod accounts;
pub mod password_reset_records;
