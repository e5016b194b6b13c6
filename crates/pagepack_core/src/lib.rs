pub mod config;
pub mod hash;
pub mod integrity;
pub mod minifier;
pub mod scheduler;
pub mod types;
