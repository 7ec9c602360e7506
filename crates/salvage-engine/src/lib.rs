//! Salvage Engine - Orchestration layer
//!
//! Provides the recovery runs (recover, organize, conversation extraction)
//! that coordinate core domain logic with the store, plus the runtime
//! configuration they are driven by.

pub mod commands;
pub mod config;

pub use config::SalvageConfig;
