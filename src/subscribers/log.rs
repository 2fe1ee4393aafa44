//! # Line-oriented status logging subscriber.
//!
//! [`LogWriter`] prints every watchdog event as one human-readable line:
//! informational lines to stdout, failure lines to stderr. This is the
//! default operational log sink of the watchdog — every state transition
//! and recovery step shows up here with enough detail to diagnose without
//! reproducing.
//!
//! ## Output format
//! ```text
//! [link-up] topic=sensors/#
//! [stale] silence_ms=65000
//! [recovery] starting
//! [run] cmd="pkill -f 'ssh -N -L 1883'"
//! [output] Authenticated to bastion
//! [exited] code=0
//! [settling] delay_ms=2000
//! [recovered] topic=sensors/#
//! [shutdown-requested]
//! [stopped]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Stdout/stderr logging subscriber.
///
/// Informational events go to stdout, failures to stderr, one line each.
/// For structured logging or metrics, implement a custom [`Subscribe`]
/// instead and register it alongside (or instead of) this one.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::LinkUp => {
                println!("[link-up] topic={}", opt(&e.topic));
            }
            EventKind::ConnectionLost => {
                eprintln!("[connection-lost] reason={:?}", opt(&e.reason));
            }
            EventKind::ConnectFailed => {
                eprintln!("[connect-failed] err={:?}", opt(&e.reason));
            }
            EventKind::StaleDetected => {
                println!("[stale] silence_ms={}", e.elapsed_ms.unwrap_or(0));
            }
            EventKind::RecoveryStarted => {
                println!("[recovery] starting");
            }
            EventKind::CommandRunning => {
                println!("[run] cmd={:?}", opt(&e.reason));
            }
            EventKind::CommandOutput => {
                println!("[output] {}", opt(&e.reason));
            }
            EventKind::CommandExited => match e.exit_code {
                Some(code) => println!("[exited] code={code}"),
                None => println!("[exited] {}", opt(&e.reason)),
            },
            EventKind::TunnelSpawnFailed => {
                eprintln!("[tunnel-spawn-failed] err={:?}", opt(&e.reason));
            }
            EventKind::Settling => {
                println!("[settling] delay_ms={}", e.delay_ms.unwrap_or(0));
            }
            EventKind::RecoverySucceeded => {
                println!("[recovered] topic={}", opt(&e.topic));
            }
            EventKind::RecoveryFailed => {
                eprintln!("[recovery-failed] err={:?}", opt(&e.reason));
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::Stopped => {
                println!("[stopped]");
            }
            EventKind::GraceExceeded => {
                eprintln!("[grace-exceeded] grace_ms={}", e.delay_ms.unwrap_or(0));
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}

fn opt(field: &Option<std::sync::Arc<str>>) -> &str {
    field.as_deref().unwrap_or("")
}
