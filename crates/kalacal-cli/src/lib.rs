//! kalacal-cli
//!
//! Command-line front end: config file handling and plain-text rendering of
//! catalogs, validation results and explanations.

pub mod commands;
pub mod config;
