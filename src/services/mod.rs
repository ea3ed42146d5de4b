// src/services/mod.rs
pub mod commands;
pub mod did_updater;
pub mod resolver;
