// src/utils/mod.rs
pub mod crypto;
pub mod prompt;
pub mod serialization;
