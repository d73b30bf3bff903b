pub mod job;
pub mod image;
pub mod config;
pub mod instance;
