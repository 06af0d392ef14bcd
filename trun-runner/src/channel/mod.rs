// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event channel: an append-only, line-framed file through which the
//! child process (an adapter or a native-stream parser) communicates
//! structured events back to the orchestrator.

mod reader;

pub use reader::ChannelReader;

/// Environment variable through which the absolute path to the event
/// channel file is passed to the child process.
pub const CHANNEL_PATH_ENV: &str = "TRUN_IPC_PATH";

/// Environment variable carrying an optional log-level threshold, read by
/// adapters that want to mirror the host's verbosity.
pub const DEBUG_LEVEL_ENV: &str = "TRUN_LOG";

/// The channel's file name within the run directory.
pub const CHANNEL_FILE_NAME: &str = "ipc.jsonl";

/// Bound on the in-memory channel between the [`ChannelReader`] and the
/// dispatcher. Producers are a file and a process, neither of which can be
/// throttled by backpressure on this channel, so the bound exists only to
/// cap memory use under a burst, not to apply backpressure upstream.
pub const DISPATCH_CHANNEL_CAPACITY: usize = 65_536;
