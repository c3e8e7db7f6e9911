//! Shared types for the Ophiuchus quest service
//!
//! Error taxonomy, configuration resolution, the game data model, and
//! database initialization used by the ophiuchus-quest service crate.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use crate::error::{Error, Result};
