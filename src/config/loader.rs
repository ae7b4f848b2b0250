// src/config/loader.rs

use std::io::Read;

use crate::config::model::{Config, RawConfig};
use crate::errors::Result;

/// Parse a YAML document into a `RawConfig`.
///
/// This only performs deserialization; it does **not** default names or parse
/// durations. Use [`load_and_validate`] for that.
pub fn load_from_str(contents: &str) -> Result<RawConfig> {
    let config: RawConfig = serde_yaml::from_str(contents)?;
    Ok(config)
}

/// Read a whole YAML document from `reader` (normally stdin).
pub fn load_from_reader(mut reader: impl Read) -> Result<RawConfig> {
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    load_from_str(&contents)
}

/// Read, deserialize and validate a configuration document.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads YAML.
/// - Applies serde defaults.
/// - Defaults command names and parses every duration literal.
pub fn load_and_validate(reader: impl Read) -> Result<Config> {
    let raw_config = load_from_reader(reader)?;
    let config = Config::try_from(raw_config)?;
    Ok(config)
}
