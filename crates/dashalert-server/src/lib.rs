//! Administrative entry point for the dashboard alert store.

pub mod commands;
pub mod config;
