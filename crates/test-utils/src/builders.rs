#![allow(dead_code)]

use std::time::Duration;

use procmux::config::{CommandSpec, Config};

/// Builder for `CommandSpec` to simplify test setup.
pub struct CommandSpecBuilder {
    spec: CommandSpec,
}

impl CommandSpecBuilder {
    pub fn new(name: &str, program: &str) -> Self {
        Self {
            spec: CommandSpec::new(name, program),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.spec.args.push(arg.to_string());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.spec.args.extend(args.iter().map(|a| a.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.spec.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn restart_tries(mut self, tries: i32) -> Self {
        self.spec.restart_tries = tries;
        self
    }

    pub fn restart_after(mut self, delay: Duration) -> Self {
        self.spec.restart_after = delay;
        self
    }

    pub fn start_after(mut self, delay: Duration) -> Self {
        self.spec.start_after = delay;
        self
    }

    pub fn max_duration(mut self, limit: Duration) -> Self {
        self.spec.max_duration = limit;
        self
    }

    pub fn silent(mut self, val: bool) -> Self {
        self.spec.silent = val;
        self
    }

    pub fn build(self) -> CommandSpec {
        self.spec
    }
}

/// Builder for a validated `Config`.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                commands: Vec::new(),
                setup_commands: Vec::new(),
                shutdown_commands: Vec::new(),
                kill_others: false,
                kill_timeout: Duration::ZERO,
                no_colors: true,
                enable_tui: false,
            },
        }
    }

    pub fn command(mut self, spec: CommandSpec) -> Self {
        self.config.commands.push(spec);
        self
    }

    pub fn setup(mut self, spec: CommandSpec) -> Self {
        self.config.setup_commands.push(spec);
        self
    }

    pub fn shutdown(mut self, spec: CommandSpec) -> Self {
        self.config.shutdown_commands.push(spec);
        self
    }

    pub fn kill_others(mut self, val: bool) -> Self {
        self.config.kill_others = val;
        self
    }

    pub fn kill_timeout(mut self, grace: Duration) -> Self {
        self.config.kill_timeout = grace;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
