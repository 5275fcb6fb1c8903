pub mod btle;
pub mod constants;
pub mod manager;
pub mod types;
