// src/config/mod.rs

//! Configuration loading and validation for procmux.
//!
//! Responsibilities:
//! - Define the YAML-backed data model (`model.rs`).
//! - Read a document from stdin or a string (`loader.rs`).
//! - Default names, parse durations and build `CommandSpec`s (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_reader, load_from_str};
pub use model::{CommandSpec, Config, RawCommand, RawConfig};
pub use validate::default_name;
