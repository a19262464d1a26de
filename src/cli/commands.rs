//! Subcommand handlers.

use std::path::Path;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use super::args::{
    Args, CameraArgs, CheckArgs, Command, ConfigAction, RecordsArgs, RegisterArgs, StudentsArgs,
};
use super::session::{interrupted, SessionCommand, SessionInput, CHECK_HELP, REGISTER_HELP};
use super::surface::TerminalSurface;
use crate::api::{service_root, ApiError, RecognitionClient};
use crate::attendance::{AttendanceCheck, CheckOutcome};
use crate::camera::{self, CameraError, CameraSession, FfmpegBackend};
use crate::config::{default_path, write_default, Config, ConfigError};
use crate::models::{AttendanceRecord, StudentProfile};
use crate::records::{CsvStyle, ExportError, FilterCriteria, RecordBrowser};
use crate::registration::{FormField, RegistrationError, RegistrationFlow, MIN_IMAGES};
use crate::services::Services;
use crate::store::{StoreError, SupabaseStore};

/// How often the session loop checks for Ctrl+C while waiting for input.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Errors reported by the binary as `Error: <message>`.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("Recognition backend: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Failed to create async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Dispatch a parsed command line.
pub fn run(args: Args) -> Result<(), CliError> {
    // `config init` may target a path that doesn't exist yet.
    if let Command::Config {
        action: ConfigAction::Init,
    } = &args.command
    {
        return handle_config_action(&Config::default(), args.config.as_deref(), ConfigAction::Init);
    }

    let mut config = load_config(args.config.as_deref())?;
    config.apply_env();
    if let Some(url) = args.api_url {
        config.api.base_url = Some(url);
    }

    match args.command {
        Command::Register(register) => run_register(&config, register),
        Command::Check(check) => run_check(&config, check),
        Command::Records(records) => run_records(&config, records),
        Command::Students(students) => run_students(&config, students),
        Command::Health => run_health(&config),
        Command::ListDevices => list_cameras(),
        Command::Config { action } => {
            handle_config_action(&config, args.config.as_deref(), action)
        }
    }
}

/// An explicit `--config` must load; the default location falls back to
/// defaults with a warning.
fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => Config::load_from_explicit(path),
        None => match Config::load(None) {
            Ok(config) => Ok(config),
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                eprintln!("Using default settings.\n");
                Ok(Config::default())
            }
        },
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new().map_err(CliError::Runtime)
}

fn recognition_client(config: &Config) -> Result<RecognitionClient, ApiError> {
    RecognitionClient::with_timeouts(
        config.api_base_url(),
        config.api_timeout(),
        config.api_connect_timeout(),
    )
}

fn record_store(config: &Config) -> Result<SupabaseStore, StoreError> {
    let url = config.store.url.clone().ok_or(StoreError::MissingUrl)?;
    let key = config.store.key.clone().ok_or(StoreError::MissingKey)?;
    SupabaseStore::with_timeouts(url, key, config.api_timeout(), config.api_connect_timeout())
}

fn services(config: &Config) -> Result<Services, CliError> {
    let store = record_store(config)?;
    let recognition = recognition_client(config)?;
    Ok(Services::new(Arc::new(store), Arc::new(recognition)))
}

/// Camera session from config with command-line overrides applied.
fn camera_session(config: &Config, overrides: &CameraArgs) -> CameraSession {
    let mut settings = config.camera_settings();
    if let Some(device) = &overrides.device {
        settings.constraints.device = Some(device.clone());
    }
    if let Some(facing) = overrides.facing {
        settings.constraints.facing = facing;
    }
    if let Some(format) = overrides.format {
        settings.encode.format = format;
    }
    if let Some(quality) = overrides.quality {
        settings.encode.quality = quality;
    }

    CameraSession::new(
        Box::new(FfmpegBackend::new(settings.acquire_timeout)),
        Box::new(TerminalSurface::new()),
        settings,
    )
}

fn next_command(rx: &std::sync::mpsc::Receiver<SessionCommand>) -> Option<SessionCommand> {
    loop {
        if interrupted() {
            return None;
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(command) => return Some(command),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn run_register(config: &Config, args: RegisterArgs) -> Result<(), CliError> {
    let mut flow = RegistrationFlow::new(services(config)?, camera_session(config, &args.camera));

    let prefill = [
        (FormField::Name, args.name),
        (FormField::Branch, args.branch),
        (FormField::Year, args.year),
        (FormField::RollNumber, args.roll),
        (FormField::Email, args.email),
    ];
    for (field, value) in prefill {
        if let Some(value) = value {
            flow.form_mut().set(field, value);
        }
    }

    flow.start_camera()?;
    let rt = runtime()?;

    println!("{}", REGISTER_HELP);
    print_registration(&flow);
    let rx = SessionInput::spawn_listener(false);

    while let Some(command) = next_command(&rx) {
        match command {
            SessionCommand::Capture => match flow.capture() {
                Ok(count) => println!(
                    "Captured image {} ({} needed)",
                    count,
                    MIN_IMAGES.saturating_sub(count)
                ),
                Err(e) => println!("Capture failed: {}", e),
            },
            SessionCommand::Remove(index) => match flow.remove_image(index) {
                Some(_) => println!(
                    "Removed image {}, {} left",
                    index + 1,
                    flow.images().len()
                ),
                None => println!("No image {}", index + 1),
            },
            SessionCommand::Set(field, value) => {
                flow.form_mut().set(field, value);
            }
            SessionCommand::List => print_registration(&flow),
            SessionCommand::Submit => {
                println!("Submitting...");
                match rt.block_on(flow.submit()) {
                    Ok(outcome) => {
                        println!(
                            "Registered {} ({}): {} of {} face image(s) enrolled",
                            outcome.student.name,
                            outcome.student.roll_number,
                            outcome.accepted,
                            outcome.attempted
                        );
                        for failure in &outcome.failures {
                            println!("  image {}: {}", failure.index + 1, failure.message);
                        }
                        return Ok(());
                    }
                    Err(RegistrationError::Validation(e)) => println!("{}", e),
                    Err(e) => {
                        println!("Registration failed: {}", e);
                        println!("Form and images kept, submit again when ready.");
                    }
                }
            }
            SessionCommand::Reset => {
                flow.reset();
                flow.start_camera()?;
                println!("Form and images cleared");
            }
            SessionCommand::Help => println!("{}", REGISTER_HELP),
            SessionCommand::Check => println!("Use the 'check' command to take attendance"),
            SessionCommand::Quit => break,
        }
    }

    Ok(())
}

fn print_registration(flow: &RegistrationFlow) {
    let form = flow.form();
    for field in FormField::ALL {
        let value = form.value(field);
        println!(
            "  {:<12} {}",
            field.label(),
            if value.is_empty() { "-" } else { value }
        );
    }
    println!(
        "  Images       {} captured (minimum {})",
        flow.images().len(),
        MIN_IMAGES
    );
    for (i, image) in flow.images().iter().enumerate() {
        println!(
            "    {}. {}x{} {} ({} bytes)",
            i + 1,
            image.width,
            image.height,
            image.format.as_str(),
            image.len()
        );
    }
}

fn run_check(config: &Config, args: CheckArgs) -> Result<(), CliError> {
    let mut check = AttendanceCheck::new(services(config)?, camera_session(config, &args.camera));
    check.start_camera()?;
    let rt = runtime()?;

    if args.once {
        let outcome = rt.block_on(check.check_once())?;
        print_outcome(&outcome);
        return match outcome {
            CheckOutcome::Failed { message } => Err(CliError::Failed(message)),
            _ => Ok(()),
        };
    }

    println!("{}", CHECK_HELP);
    let rx = SessionInput::spawn_listener(true);

    while let Some(command) = next_command(&rx) {
        match command {
            SessionCommand::Check | SessionCommand::Capture => {
                println!("Recognizing...");
                match rt.block_on(check.check_once()) {
                    Ok(outcome) => print_outcome(&outcome),
                    Err(e) => println!("Capture failed: {}", e),
                }
            }
            SessionCommand::Help => println!("{}", CHECK_HELP),
            SessionCommand::Quit => break,
            _ => println!("Not available during attendance checks (type 'help')"),
        }
    }

    Ok(())
}

fn print_outcome(outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::Matched { .. } => println!("MATCH: {}", outcome),
        CheckOutcome::Unmatched { .. } => println!("NO MATCH: {}", outcome),
        CheckOutcome::Failed { .. } => println!("ERROR: {}", outcome),
    }
}

fn run_records(config: &Config, args: RecordsArgs) -> Result<(), CliError> {
    let store = record_store(config)?;
    let page_size = args
        .limit
        .map(|l| l as usize)
        .unwrap_or(config.store.page_size);
    let mut browser = RecordBrowser::with_page_size(Arc::new(store), page_size);

    let rt = runtime()?;
    rt.block_on(browser.load())?;

    if args.branches {
        for branch in browser.distinct_branches() {
            println!("{}", branch);
        }
        return Ok(());
    }

    let criteria = FilterCriteria {
        date: args.date,
        branch: args.branch,
        year: args.year,
        search: args.search,
    };
    let filtered = browser.filter(&criteria);
    print_records(&filtered);
    println!(
        "\n{} of {} record(s)",
        filtered.len(),
        browser.records().len()
    );

    if args.export {
        let dir = args.dir.unwrap_or_else(|| config.export_dir());
        let style = if args.legacy_csv {
            CsvStyle::Legacy
        } else {
            config.csv_style()
        };
        let today = chrono::Utc::now().date_naive();
        match browser.export_csv(&criteria, &dir, today, style)? {
            Some(path) => println!("Exported to {}", path.display()),
            None => println!("No records to export"),
        }
    }

    Ok(())
}

fn print_records(records: &[&AttendanceRecord]) {
    if records.is_empty() {
        println!("No attendance records found");
        return;
    }
    println!(
        "{:<24} {:<12} {:<8} {:<4} {:<26} {:>10}",
        "Name", "Roll Number", "Branch", "Year", "Timestamp", "Confidence"
    );
    for record in records {
        println!(
            "{:<24} {:<12} {:<8} {:<4} {:<26} {:>10}",
            record.name,
            record.roll_number,
            record.branch,
            record.year,
            record.timestamp,
            record.confidence_display()
        );
    }
}

fn run_students(config: &Config, args: StudentsArgs) -> Result<(), CliError> {
    let rt = runtime()?;

    if args.via_backend {
        let client = recognition_client(config)?;
        let students = rt.block_on(client.list_students())?;
        print_students(&students);
        return Ok(());
    }

    let store = record_store(config)?;
    match args.roll {
        Some(roll) => match rt.block_on(store.find_student_by_roll(&roll))? {
            Some(student) => print_students(std::slice::from_ref(&student)),
            None => println!("No student with roll number {}", roll),
        },
        None => {
            let students = rt.block_on(store.list_students())?;
            print_students(&students);
        }
    }
    Ok(())
}

fn print_students(students: &[StudentProfile]) {
    if students.is_empty() {
        println!("No students registered");
        return;
    }
    println!(
        "{:<24} {:<12} {:<8} {:<4} {}",
        "Name", "Roll Number", "Branch", "Year", "Email"
    );
    for student in students {
        println!(
            "{:<24} {:<12} {:<8} {:<4} {}",
            student.name, student.roll_number, student.branch, student.year, student.email
        );
    }
}

fn run_health(config: &Config) -> Result<(), CliError> {
    let client = recognition_client(config)?;
    let rt = runtime()?;
    let status = rt.block_on(client.health())?;
    let root = service_root(client.base_url());
    if status.is_healthy() {
        println!("Backend at {} is healthy", root);
        Ok(())
    } else {
        Err(CliError::Failed(format!(
            "Backend at {} reported status '{}'",
            root, status.status
        )))
    }
}

/// List available cameras and print them to stdout.
pub fn list_cameras() -> Result<(), CliError> {
    let devices = camera::list_devices()?;
    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and permissions are granted.");
        println!("On macOS, grant access in System Settings > Privacy & Security > Camera.");
    } else {
        println!("Available cameras:");
        for device in devices {
            println!("  {}", device);
        }
        println!();
        println!("Use --device <index> to select a camera.");
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    config: &Config,
    explicit: Option<&Path>,
    action: ConfigAction,
) -> Result<(), CliError> {
    let config_path = explicit.map(Path::to_path_buf).unwrap_or_else(default_path);
    match action {
        ConfigAction::Show => {
            println!("Current configuration:\n");
            print!("{}", config.render());
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            write_default(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}
