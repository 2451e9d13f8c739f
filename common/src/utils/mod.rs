pub mod config;
pub mod embedding;
pub mod retry;
