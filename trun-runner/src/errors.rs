// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the run engine.

use camino::Utf8PathBuf;
use thiserror::Error;

/// An error that occurred while standing up or running the event channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChannelError {
    /// The channel file could not be created at startup.
    #[error("failed to create event channel file at `{path}`")]
    Create {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The channel file could not be opened for reading at startup. This is
    /// fatal: without it the orchestrator cannot observe any events.
    #[error("failed to open event channel file at `{path}` for reading")]
    OpenForRead {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Setting up the filesystem watcher failed.
    #[error("failed to watch event channel file at `{path}`")]
    Watch {
        path: Utf8PathBuf,
        #[source]
        error: notify::Error,
    },

    /// A read from the channel file failed after it was successfully opened.
    #[error("failed to read event channel file at `{path}`")]
    Read {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while mutating the group store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GroupStoreError {
    /// A result or case event referenced a parent chain that, after
    /// normalization, was empty.
    #[error("event referenced an empty parent chain")]
    EmptyParentChain,
}

/// An error that occurred while writing a report document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportWriteError {
    /// The temporary file used for the atomic rename could not be written.
    #[error("failed to write temporary report file at `{path}`")]
    WriteTemp {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The rename from the temporary file to the destination failed.
    #[error("failed to rename report file into place at `{path}`")]
    Rename {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// A parent directory for a report document could not be created.
    #[error("failed to create report directory at `{path}`")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },
}

/// An error returned by the runner registry when no definition matches an
/// invocation.
#[derive(Debug, Error)]
#[error(
    "no supported test runner detected for command `{}`\n(supported runners: {})",
    command.join(" "),
    supported.join(", ")
)]
pub struct NoRunnerDetected {
    pub command: Vec<String>,
    pub supported: Vec<&'static str>,
}

/// Top-level error for a single invocation of `trun`.
///
/// This is the error type the `trun` binary matches on to decide an exit
/// code, per the External Interfaces contract: a startup failure before the
/// child is launched must exit non-zero with a message on stderr and must
/// not leave behind a report tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    /// No runner matched the invocation.
    #[error(transparent)]
    NoRunnerDetected(#[from] NoRunnerDetected),

    /// The run directory could not be created.
    #[error("failed to create run directory at `{path}`")]
    CreateRunDir {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The combined child stdio log could not be created.
    #[error("failed to create output log at `{path}`")]
    CreateOutputLog {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Extracting an adapter payload into the run directory failed.
    #[error("failed to extract adapter `{adapter}` into `{path}`")]
    AdapterExtraction {
        adapter: &'static str,
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The child process could not be spawned.
    #[error("failed to spawn child command `{}`", command.join(" "))]
    ChildSpawn {
        command: Vec<String>,
        #[source]
        error: std::io::Error,
    },

    /// Setting up the signal handler failed.
    #[error("failed to set up signal handler")]
    SignalSetup(#[source] std::io::Error),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    GroupStore(#[from] GroupStoreError),

    #[error(transparent)]
    ReportWrite(#[from] ReportWriteError),

    /// Waiting on the child process failed.
    #[error("failed to wait on child process")]
    ChildWait(#[source] std::io::Error),
}
