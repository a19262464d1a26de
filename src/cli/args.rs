//! CLI argument parsing with clap.

use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::camera::{FacingMode, ImageFormat};

/// Register students and take attendance by face recognition
#[derive(Parser, Debug)]
#[command(name = "face-attendance")]
#[command(version, about = "Face-recognition attendance front end", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Register a student, capturing images interactively
    face-attendance register --name \"Asha Rao\" --branch CS --year 2 \\
        --roll CS2201 --email asha@example.edu

    # Run attendance checks from the default camera
    face-attendance check

    # Export today's CS records
    face-attendance records --branch CS --date 2024-03-01 --export")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Recognition backend URL including the /api prefix
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a new student and enroll their face
    Register(RegisterArgs),
    /// Take attendance by recognizing faces
    Check(CheckArgs),
    /// Browse, filter and export attendance records
    Records(RecordsArgs),
    /// List registered students
    Students(StudentsArgs),
    /// Check that the recognition backend is up
    Health,
    /// List available cameras
    ListDevices,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

/// Camera overrides shared by the capture commands.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CameraArgs {
    /// Camera index, device path or name (see list-devices)
    #[arg(long)]
    pub device: Option<String>,

    /// Preferred camera direction when no device is named
    #[arg(long)]
    pub facing: Option<FacingMode>,

    /// Still image format: jpeg or png
    #[arg(long)]
    pub format: Option<ImageFormat>,

    /// JPEG quality (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub camera: CameraArgs,

    /// Full name
    #[arg(long)]
    pub name: Option<String>,

    /// Branch, e.g. CS
    #[arg(long)]
    pub branch: Option<String>,

    /// Year of study
    #[arg(long)]
    pub year: Option<String>,

    /// Unique roll number
    #[arg(long)]
    pub roll: Option<String>,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub camera: CameraArgs,

    /// Run a single check and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RecordsArgs {
    /// Only records whose timestamp contains this text, e.g. 2024-03-01
    #[arg(long)]
    pub date: Option<String>,

    /// Only this branch (exact match)
    #[arg(long)]
    pub branch: Option<String>,

    /// Only this year
    #[arg(long)]
    pub year: Option<u32>,

    /// Name or roll number contains this text (case-insensitive)
    #[arg(long, short)]
    pub search: Option<String>,

    /// Print the branches present in the loaded records and exit
    #[arg(long)]
    pub branches: bool,

    /// Write the filtered records to a CSV file
    #[arg(long)]
    pub export: bool,

    /// Directory for the CSV file
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Unescaped comma join, matching older exports
    #[arg(long)]
    pub legacy_csv: bool,

    /// Number of recent records to load
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: Option<u32>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct StudentsArgs {
    /// Look up a single roll number
    #[arg(long)]
    pub roll: Option<String>,

    /// Ask the recognition backend instead of the record store
    #[arg(long, conflicts_with = "roll")]
    pub via_backend: bool,
}
