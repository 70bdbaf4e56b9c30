pub mod employee;
pub mod pending_user;
pub mod permission;
pub mod request;
pub mod user;
