// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for the orchestrator.
//!
//! Only SIGINT and SIGTERM are meaningful to a run: both terminate the
//! child and trigger graceful shutdown, differing only in the deadline
//! given to that shutdown (see [`ShutdownReason::deadline`]).

use std::time::Duration;

/// Why the orchestrator is shutting down early.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl-C. Exits with code 130.
    Interrupt,
    /// SIGTERM. Exits by mirroring the child's exit code where possible,
    /// 130 otherwise.
    Terminate,
}

impl ShutdownReason {
    /// The exit code to use when this shutdown reason preempts a normal
    /// child exit.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Interrupt => 130,
            Self::Terminate => 130,
        }
    }

    /// The deadline given to graceful shutdown (final drain + report flush)
    /// before the orchestrator gives up waiting and exits anyway. SIGTERM
    /// is assumed to come from an external supervisor with its own kill
    /// timer, so it gets a shorter deadline than an interactive Ctrl-C.
    pub fn deadline(self) -> Duration {
        match self {
            Self::Interrupt => Duration::from_secs(5),
            Self::Terminate => Duration::from_secs(2),
        }
    }
}

/// Waits for a shutdown-triggering signal.
///
/// A no-op variant isn't needed here (unlike the teacher's richer
/// job-control handling): tests that don't want signal handling running
/// simply never await this future.
pub async fn wait_for_shutdown() -> ShutdownReason {
    imp::wait_for_shutdown().await
}

#[cfg(unix)]
mod imp {
    use super::ShutdownReason;
    use tokio::signal::unix::{SignalKind, signal};

    pub(super) async fn wait_for_shutdown() -> ShutdownReason {
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => ShutdownReason::Interrupt,
            _ = sigterm.recv() => ShutdownReason::Terminate,
        }
    }
}

#[cfg(windows)]
mod imp {
    use super::ShutdownReason;
    use tokio::signal::windows::ctrl_c;

    pub(super) async fn wait_for_shutdown() -> ShutdownReason {
        let mut ctrl_c = ctrl_c().expect("failed to install Ctrl-C handler");
        ctrl_c.recv().await;
        ShutdownReason::Interrupt
    }
}
