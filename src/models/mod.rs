// src/models/mod.rs
pub mod credentials;
pub mod did;
