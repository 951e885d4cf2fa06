pub mod config;
pub mod slots;
