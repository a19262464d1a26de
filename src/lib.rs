//! face-attendance library crate.
//!
//! Front end for a face-recognition attendance service: camera capture,
//! student registration, attendance checks and record browsing. The
//! recognition backend and the record store are external HTTP services.

pub mod api;
pub mod attendance;
pub mod camera;
pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod records;
pub mod registration;
pub mod services;
pub mod store;
