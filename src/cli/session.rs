//! Interactive session input for the capture commands.
//!
//! A background thread reads stdin and forwards parsed commands over a
//! channel, so the main loop can keep watching for Ctrl+C.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;

use crate::registration::FormField;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C handler. The loop notices via [`interrupted`] and
/// returns normally so the camera is released on drop.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        INTERRUPTED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, releasing camera...");
    })
}

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Commands typed during a capture session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Capture a still frame (registration)
    Capture,
    /// Remove a captured image by zero-based index
    Remove(usize),
    /// Show the form and captured images
    List,
    /// Fill in a form field
    Set(FormField, String),
    /// Submit the registration
    Submit,
    /// Run one attendance check
    Check,
    /// Clear the form and images
    Reset,
    Help,
    Quit,
}

pub const REGISTER_HELP: &str = "Commands:
  capture | c            capture a face image
  remove <n>             remove image number n
  set <field> <value>    field: name, branch, year, roll, email
  list | l               show form and images
  submit                 create the student and enroll the images
  reset                  clear form and images
  quit | q               leave";

pub const CHECK_HELP: &str = "Commands:
  check | c | <enter>    recognize the face in front of the camera
  quit | q               leave";

/// Reads stdin on a background thread.
pub struct SessionInput;

impl SessionInput {
    /// Spawn the reader. Blank lines are forwarded as `Check` when
    /// `blank_is_check` is set and ignored otherwise.
    pub fn spawn_listener(blank_is_check: bool) -> mpsc::Receiver<SessionCommand> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let stdin = io::stdin();
            let handle = stdin.lock();

            Self::print_prompt();
            for line in handle.lines() {
                let Ok(input) = line else { break };
                let command = if blank_is_check && input.trim().is_empty() {
                    Some(SessionCommand::Check)
                } else {
                    match Self::parse_input(&input) {
                        Ok(command) => command,
                        Err(message) => {
                            Self::print_status(&message);
                            None
                        }
                    }
                };
                if let Some(command) = command {
                    let quit = command == SessionCommand::Quit;
                    if tx.send(command).is_err() || quit {
                        break;
                    }
                }
                Self::print_prompt();
            }
        });

        rx
    }

    /// Parse one line. `Ok(None)` for blank input.
    pub fn parse_input(input: &str) -> Result<Option<SessionCommand>, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (trimmed, ""),
        };
        let command = match word.to_lowercase().as_str() {
            "capture" | "c" => SessionCommand::Capture,
            "check" => SessionCommand::Check,
            "list" | "l" | "ls" => SessionCommand::List,
            "submit" => SessionCommand::Submit,
            "reset" => SessionCommand::Reset,
            "help" | "h" | "?" => SessionCommand::Help,
            "quit" | "q" | "exit" => SessionCommand::Quit,
            "remove" | "rm" => {
                let n: usize = rest
                    .parse()
                    .map_err(|_| "Usage: remove <image number>".to_string())?;
                if n == 0 {
                    return Err("Image numbers start at 1".to_string());
                }
                SessionCommand::Remove(n - 1)
            }
            "set" => {
                let (field, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "Usage: set <field> <value>".to_string())?;
                SessionCommand::Set(parse_field(field)?, value.trim().to_string())
            }
            other => return Err(format!("Unknown command: {} (type 'help')", other)),
        };
        Ok(Some(command))
    }

    pub fn print_prompt() {
        print!("> ");
        let _ = io::stdout().flush();
    }

    pub fn print_status(message: &str) {
        println!("{}", message);
    }
}

fn parse_field(name: &str) -> Result<FormField, String> {
    match name.to_lowercase().as_str() {
        "name" => Ok(FormField::Name),
        "branch" => Ok(FormField::Branch),
        "year" => Ok(FormField::Year),
        "roll" | "roll_number" | "roll-number" => Ok(FormField::RollNumber),
        "email" => Ok(FormField::Email),
        other => Err(format!(
            "Unknown field '{}'. Use name, branch, year, roll or email",
            other
        )),
    }
}
