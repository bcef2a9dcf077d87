//! Shared configuration, error types, wire models, and temp-file storage for
//! the Tubeclip crates.

pub mod config;
pub mod errors;
pub mod models;
pub mod temp_storage;
