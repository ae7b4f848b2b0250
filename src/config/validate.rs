// src/config/validate.rs

use crate::config::duration::parse_duration;
use crate::config::model::{CommandSpec, Config, RawCommand, RawConfig};
use crate::errors::{ProcmuxError, Result};

impl TryFrom<RawConfig> for Config {
    type Error = ProcmuxError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        let commands = convert_list(&raw.commands, "commands")?;
        let setup_commands = convert_list(&raw.setup_commands, "setupCommands")?;
        let shutdown_commands = convert_list(&raw.shutdown_commands, "shutdownCommands")?;
        Ok(Config::new_unchecked(
            &raw,
            commands,
            setup_commands,
            shutdown_commands,
        ))
    }
}

fn convert_list(raw: &[RawCommand], list: &str) -> Result<Vec<CommandSpec>> {
    raw.iter()
        .enumerate()
        .map(|(idx, cmd)| convert_command(cmd, list, idx))
        .collect()
}

fn convert_command(raw: &RawCommand, list: &str, idx: usize) -> Result<CommandSpec> {
    if raw.cmd.trim().is_empty() {
        return Err(ProcmuxError::ConfigError(format!(
            "{list}[{idx}]: `cmd` is required and must not be empty"
        )));
    }

    let name = match raw.name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_name(&raw.cmd),
    };

    if let Some(key) = raw.env.keys().find(|k| k.is_empty() || k.contains('=')) {
        return Err(ProcmuxError::ConfigError(format!(
            "command '{name}': invalid environment variable name {key:?}"
        )));
    }

    Ok(CommandSpec {
        restart_after: duration_field("restartAfter", raw.restart_after.as_deref(), &name)?,
        start_after: duration_field("startAfter", raw.start_after.as_deref(), &name)?,
        max_duration: duration_field("duration", raw.duration.as_deref(), &name)?,
        program: raw.cmd.clone(),
        args: raw.args.clone(),
        env: raw.env.clone(),
        restart_tries: raw.restart_tries,
        silent: raw.silent,
        name,
    })
}

/// Default a command name from its executable: the part after the last `/`.
///
/// A path ending in `/` keeps the whole string.
pub fn default_name(cmd: &str) -> String {
    match cmd.rfind('/') {
        Some(idx) if idx + 1 < cmd.len() => cmd[idx + 1..].to_string(),
        _ => cmd.to_string(),
    }
}

fn duration_field(
    field: &'static str,
    value: Option<&str>,
    command: &str,
) -> Result<std::time::Duration> {
    match value {
        None | Some("") => Ok(std::time::Duration::ZERO),
        Some(v) => parse_duration(v).map_err(|reason| ProcmuxError::InvalidDuration {
            field,
            command: command.to_string(),
            value: v.to_string(),
            reason,
        }),
    }
}
