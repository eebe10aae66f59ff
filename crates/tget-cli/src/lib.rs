//! Command implementations for the tget binary
//!
//! The pipeline for every command is the same: derive the log key from the
//! URL, resolve the expected digest through the transparency log client,
//! obtain the artifact bytes, and fail closed unless the log's digest
//! assertion matches what was actually received.

pub mod commands;
pub mod config;
pub mod fetch;
