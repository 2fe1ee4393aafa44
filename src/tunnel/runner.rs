//! # Run one shell command with line-streamed output.
//!
//! [`CommandRunner`] executes a shell command via `sh -c`, pumping combined
//! stdout/stderr to the event bus **line-by-line while the command runs**
//! (operational visibility during long-running commands), and returns the
//! exit outcome once the subprocess finishes.
//!
//! ## Event flow
//! ```text
//! run(cmd):
//!   publish CommandRunning ──► spawn `sh -c cmd`
//!        │                         │
//!        │          per line ──► publish CommandOutput
//!        ▼                         │
//!   wait for exit ◄────────────────┘
//!   publish CommandExited (code)
//! ```
//!
//! ## Rules
//! - A blank command is a **no-op success**: nothing spawned, no events
//!   (supports an optional kill command).
//! - Blocks the calling context until the subprocess exits; **no timeout**
//!   is imposed on the subprocess — a hung external command hangs that
//!   recovery step. Long-lived tunnel commands must background themselves
//!   (e.g. `ssh -f`).
//! - Spawn and wait failures surface as [`TunnelError`]; exit status is
//!   reported, never interpreted.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::error::TunnelError;
use crate::events::{Bus, Event, EventKind};

/// Result of one command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Blank command; nothing was spawned.
    Skipped,
    /// The subprocess ran to completion.
    Exited {
        /// Process exit code; `None` when terminated by a signal.
        code: Option<i32>,
    },
}

impl CommandOutcome {
    /// True for a blank-command no-op or a zero exit code.
    pub fn success(&self) -> bool {
        matches!(self, CommandOutcome::Skipped | CommandOutcome::Exited { code: Some(0) })
    }
}

/// Synchronous-from-the-caller's-view shell command executor.
///
/// ### Responsibilities
/// - Spawn `sh -c <command>` with both output pipes captured
/// - Stream every output line to the bus as it arrives
/// - Report the exit outcome, or a spawn/wait error
pub struct CommandRunner {
    bus: Bus,
}

impl CommandRunner {
    /// Creates a runner publishing to the given bus.
    pub fn new(bus: Bus) -> Self {
        Self { bus }
    }

    /// Runs one shell command to completion.
    ///
    /// Blank (empty or whitespace-only) commands return
    /// [`CommandOutcome::Skipped`] without spawning anything.
    pub async fn run(&self, command: &str) -> Result<CommandOutcome, TunnelError> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(CommandOutcome::Skipped);
        }

        self.bus
            .publish(Event::new(EventKind::CommandRunning).with_reason(command));

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TunnelError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Drain both pipes while waiting, so the child never blocks on a
        // full pipe and lines surface as they are written.
        let (status, (), ()) = tokio::join!(
            child.wait(),
            pump_lines(&self.bus, stdout),
            pump_lines(&self.bus, stderr),
        );
        let status = status.map_err(|source| TunnelError::Wait {
            command: command.to_string(),
            source,
        })?;

        let exited = match status.code() {
            Some(code) => Event::new(EventKind::CommandExited).with_exit_code(code),
            None => Event::new(EventKind::CommandExited).with_reason("terminated by signal"),
        };
        self.bus.publish(exited);

        Ok(CommandOutcome::Exited {
            code: status.code(),
        })
    }
}

/// Forwards each line of `stream` to the bus until EOF.
async fn pump_lines<R>(bus: &Bus, stream: Option<R>)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else { return };
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        bus.publish(Event::new(EventKind::CommandOutput).with_reason(line));
    }
}
