//! Core business logic for pollboard.

pub mod services;

pub use services::*;
