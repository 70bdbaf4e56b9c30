pub mod attendance;
pub mod employee;
pub mod health;
pub mod request;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;
