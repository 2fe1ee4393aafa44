//! External tunnel process control.
//!
//! ## Contents
//! - [`CommandRunner`] — run one shell command, stream combined output
//!   line-by-line, report the exit outcome
//! - [`TunnelController`] — domain semantics over the runner: kill any
//!   existing tunnel, start a fresh one, wait the settle delay

mod controller;
mod runner;

pub use controller::TunnelController;
pub use runner::{CommandOutcome, CommandRunner};
