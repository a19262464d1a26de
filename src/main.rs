use clap::Parser;

use face_attendance::cli::{self, Args};
use face_attendance::logging;

fn main() {
    let args = Args::parse();
    // Reads .env before the logger so RUST_LOG set there applies
    logging::init(args.verbose);

    if let Err(e) = cli::setup_ctrlc_handler() {
        eprintln!("Warning: Could not set up Ctrl+C handler: {}", e);
    }

    if let Err(e) = cli::run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
