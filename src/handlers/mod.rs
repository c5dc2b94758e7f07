pub mod admin;
pub mod payments;
