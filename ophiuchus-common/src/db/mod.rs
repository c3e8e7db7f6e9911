//! Database access shared across Ophiuchus crates

pub mod init;

pub use init::{create_tables, init_database};
