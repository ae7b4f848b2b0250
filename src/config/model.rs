// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from the YAML document on stdin.
///
/// ```yaml
/// killOthers: true
/// killTimeout: 2000
/// setupCommands:
///   - cmd: make
///     args: ["build"]
/// commands:
///   - name: api
///     cmd: ./bin/api
///     restartTries: 3
///     restartAfter: 1s
///   - cmd: npm
///     args: ["run", "dev"]
/// ```
///
/// This is the unvalidated shape; convert it with `Config::try_from`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    /// Commands supervised concurrently. Required (may be empty).
    pub commands: Vec<RawCommand>,

    #[serde(default)]
    pub setup_commands: Vec<RawCommand>,

    #[serde(default)]
    pub shutdown_commands: Vec<RawCommand>,

    /// Stop every command once any command exits without restarting.
    #[serde(default)]
    pub kill_others: bool,

    /// Grace period in milliseconds between SIGTERM and a hard kill.
    ///
    /// `0` means kill immediately.
    #[serde(default)]
    pub kill_timeout: i64,

    #[serde(default)]
    pub no_colors: bool,

    /// Use the multi-pane live display instead of plain console output.
    #[serde(default, rename = "enableTUI")]
    pub enable_tui: bool,
}

/// One command entry, in any of the three lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommand {
    /// Display name; defaults to the basename of `cmd`.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub cmd: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// `-1` (or any negative) = unlimited, `0` = never restart.
    #[serde(default)]
    pub restart_tries: i32,

    #[serde(default)]
    pub restart_after: Option<String>,

    #[serde(default)]
    pub start_after: Option<String>,

    /// Maximum run time of a single attempt.
    #[serde(default)]
    pub duration: Option<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Discard the command's stdout and stderr.
    #[serde(default)]
    pub silent: bool,
}

/// Validated configuration.
///
/// Construct via `Config::try_from(raw)`; every duration literal has already
/// been parsed and every command has a name.
#[derive(Debug, Clone)]
pub struct Config {
    pub commands: Vec<CommandSpec>,
    pub setup_commands: Vec<CommandSpec>,
    pub shutdown_commands: Vec<CommandSpec>,
    pub kill_others: bool,
    pub kill_timeout: Duration,
    pub no_colors: bool,
    pub enable_tui: bool,
}

impl Config {
    pub(crate) fn new_unchecked(
        raw: &RawConfig,
        commands: Vec<CommandSpec>,
        setup_commands: Vec<CommandSpec>,
        shutdown_commands: Vec<CommandSpec>,
    ) -> Self {
        let kill_timeout = u64::try_from(raw.kill_timeout).unwrap_or(0);
        Self {
            commands,
            setup_commands,
            shutdown_commands,
            kill_others: raw.kill_others,
            kill_timeout: Duration::from_millis(kill_timeout),
            no_colors: raw.no_colors,
            enable_tui: raw.enable_tui,
        }
    }
}

/// Immutable description of one external process to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    /// Merged over the inherited environment.
    pub env: BTreeMap<String, String>,
    pub restart_tries: i32,
    pub restart_after: Duration,
    pub start_after: Duration,
    /// `Duration::ZERO` means unbounded.
    pub max_duration: Duration,
    pub silent: bool,
}

impl CommandSpec {
    /// A spec with no delays, no restarts and no deadline.
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            restart_tries: 0,
            restart_after: Duration::ZERO,
            start_after: Duration::ZERO,
            max_duration: Duration::ZERO,
            silent: false,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        (!self.max_duration.is_zero()).then_some(self.max_duration)
    }

    pub fn has_unlimited_restarts(&self) -> bool {
        self.restart_tries < 0
    }
}
