pub mod cache;
pub mod cer;
pub mod config;
pub mod document;
pub mod errors;
pub mod render;
pub mod resolution;
pub mod session;
pub mod targets;
pub mod types;
