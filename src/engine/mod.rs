pub mod cache;
pub mod tables;
pub mod validation;
