//! Configuration loading for the `h2ctl` CLI.
//!
//! Leading `--flag value` pairs that name a [`ServerConfig`] field are handed
//! to `ortho_config`; clap only ever sees the subcommand.

use std::ffi::{OsStr, OsString};

use h2ctl_config::{ServerConfig, Toggle};
use ortho_config::OrthoConfig;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags (listed in `CONFIG_CLI_FLAGS`) must appear before
    /// the subcommand. Flags after it are handed to clap, which rejects them.
    fn load(&self, args: &[OsString]) -> Result<ServerConfig, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<ServerConfig, AppError> {
        ServerConfig::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Switch,
    Skip,
}

/// Decides whether `argument` is a configuration flag.
///
/// `--flag=value` carries its value inline and a bare `--flag` takes the
/// next argument. On/off settings are switches: they take the next argument
/// only when it reads as `true` or `false`.
fn classify_argument(argument: &OsStr) -> FlagAction {
    let Some(text) = argument.to_str() else {
        return FlagAction::Skip;
    };
    let (flag, inline_value) = text
        .split_once('=')
        .map_or((text, false), |(flag, _)| (flag, true));
    if !flag.starts_with("--") || !super::CONFIG_CLI_FLAGS.contains(&flag) {
        return FlagAction::Skip;
    }
    if !inline_value && super::TOGGLE_CLI_FLAGS.contains(&flag) {
        return FlagAction::Switch;
    }
    FlagAction::Include {
        needs_value: !inline_value,
    }
}

fn is_toggle_value(argument: &OsStr) -> bool {
    argument
        .to_str()
        .is_some_and(|text| text.parse::<Toggle>().is_ok())
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

/// Splits leading configuration flags from the subcommand and its arguments.
///
/// The program name is kept as the first configuration argument so the
/// loader sees a conventional argument vector. A switch given without a
/// value is passed on as `--flag=true`.
pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut position = 1;
    while let Some(argument) = args.get(position) {
        match classify_argument(argument) {
            FlagAction::Skip => break,
            FlagAction::Include { needs_value } => {
                let width = if needs_value { 2 } else { 1 };
                let end = (position + width).min(args.len());
                if let Some(flag_and_value) = args.get(position..end) {
                    config_arguments.extend_from_slice(flag_and_value);
                }
                position = end;
            }
            FlagAction::Switch => match args.get(position + 1) {
                Some(value) if is_toggle_value(value) => {
                    config_arguments.push(argument.clone());
                    config_arguments.push(value.clone());
                    position += 2;
                }
                _ => {
                    let mut enabled = argument.clone();
                    enabled.push("=true");
                    config_arguments.push(enabled);
                    position += 1;
                }
            },
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start: position,
    }
}
