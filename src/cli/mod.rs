//! Command-line interface definitions and helpers.
//!
//! This module contains CLI argument parsing, the interactive session input
//! used by the capture commands, and the subcommand handlers.

mod args;
mod commands;
mod session;
mod surface;

pub use args::{
    Args, CameraArgs, CheckArgs, Command, ConfigAction, RecordsArgs, RegisterArgs, StudentsArgs,
};
pub use commands::{handle_config_action, list_cameras, run, CliError};
pub use session::{interrupted, setup_ctrlc_handler, SessionCommand, SessionInput};
pub use surface::TerminalSurface;
