// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! There is nothing to configure on the command line: the configuration is
//! read from stdin. The parser only handles help and version requests and
//! rejects anything else.

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser, Subcommand};

const CONFIG_HELP: &str = "\
Configuration is read from stdin as YAML:

  commands:            # required
    - name: web        # defaults to the basename of cmd
      cmd: ./server    # required
      args: [\"--port\", \"8080\"]
      restartTries: 3  # negative = unlimited
      restartAfter: 1s
      startAfter: 500ms
      duration: 10m    # maximum run time; empty = unbounded
      env: { RUST_LOG: debug }
      silent: false
  setupCommands: []    # run one by one before commands
  shutdownCommands: [] # run one by one after commands
  killOthers: false    # stop everything when a command stops for good
  killTimeout: 0       # ms between terminate and kill
  noColors: false
  enableTUI: false

Example:
  procmux < procmux.yml

Set PROCMUX_LOG=debug for more detail.";

/// Command-line arguments for `procmux`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procmux",
    version,
    about = "Run several commands concurrently with restarts and prefixed output.",
    after_help = CONFIG_HELP,
    disable_version_flag = true
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// Print version information
    Version,
}

/// What `main` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliAction {
    /// Read the configuration from stdin and run it.
    Run,
    PrintVersion,
}

pub fn version_string() -> String {
    format!("procmux {}", env!("CARGO_PKG_VERSION"))
}

fn command() -> clap::Command {
    CliArgs::command().arg(
        Arg::new("version")
            .short('v')
            .long("version")
            .action(ArgAction::Version)
            .help("Print version"),
    )
}

/// Parse `args` without exiting.
///
/// Help and `-v/--version` come back as errors of kind
/// [`ErrorKind::DisplayHelp`] / [`ErrorKind::DisplayVersion`], as usual for
/// clap.
pub fn try_parse_from<I, T>(args: I) -> Result<CliAction, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    let args = CliArgs::from_arg_matches(&matches)?;
    Ok(match args.command {
        Some(CliCommand::Version) => CliAction::PrintVersion,
        None => CliAction::Run,
    })
}

/// Parse the process arguments.
///
/// Help and version requests print to stdout and exit 0; any other parse
/// error is printed to stderr and exits 1.
pub fn parse() -> CliAction {
    match try_parse_from(std::env::args_os()) {
        Ok(action) => action,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(1);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(args: &[&str]) -> Option<ErrorKind> {
        try_parse_from(args.iter().copied()).err().map(|e| e.kind())
    }

    #[test]
    fn no_arguments_runs() {
        assert_eq!(try_parse_from(["procmux"]).unwrap(), CliAction::Run);
    }

    #[test]
    fn version_forms() {
        assert_eq!(
            try_parse_from(["procmux", "version"]).unwrap(),
            CliAction::PrintVersion
        );
        assert_eq!(kind(&["procmux", "-v"]), Some(ErrorKind::DisplayVersion));
        assert_eq!(kind(&["procmux", "--version"]), Some(ErrorKind::DisplayVersion));
    }

    #[test]
    fn help_forms() {
        assert_eq!(kind(&["procmux", "-h"]), Some(ErrorKind::DisplayHelp));
        assert_eq!(kind(&["procmux", "--help"]), Some(ErrorKind::DisplayHelp));
        assert_eq!(kind(&["procmux", "help"]), Some(ErrorKind::DisplayHelp));
    }

    #[test]
    fn anything_else_is_an_error() {
        for args in [&["procmux", "--bogus"][..], &["procmux", "start"][..]] {
            let kind = kind(args).expect("should fail");
            assert!(
                !matches!(kind, ErrorKind::DisplayHelp | ErrorKind::DisplayVersion),
                "{args:?} gave {kind:?}"
            );
        }
    }

    #[test]
    fn version_string_names_the_binary() {
        assert!(version_string().starts_with("procmux "));
    }
}
