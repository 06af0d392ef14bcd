// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ChannelError;
use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use trun_metadata::Event;

/// Reads the event channel file, tolerating partial trailing lines, and
/// publishes parsed events to a bounded channel.
///
/// Shutdown discipline (spec-mandated, see the module docs on
/// [`crate::orchestrator`]): the reader must perform a final drain *after*
/// the child has exited but *before* the watcher and file are closed, or a
/// non-trivial fraction of events flushed in the narrow window between the
/// child's exit and cleanup are lost. [`ChannelReader::run`] implements
/// this ordering directly so that no caller can get it wrong.
pub struct ChannelReader {
    path: Utf8PathBuf,
    file: tokio::fs::File,
    /// Byte offset up to which the file has been fully consumed.
    pos: u64,
    /// Bytes read past `pos` that don't yet form a complete (LF-terminated)
    /// line.
    pending: Vec<u8>,
}

impl ChannelReader {
    /// Opens the channel file for reading. The file must already exist
    /// (the orchestrator creates it before spawning the child); a missing
    /// file is a fatal error per the Event Channel's failure modes.
    pub async fn open(path: &Utf8Path) -> Result<Self, ChannelError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|error| ChannelError::OpenForRead {
                path: path.to_owned(),
                error,
            })?;
        Ok(Self {
            path: path.to_owned(),
            file,
            pos: 0,
            pending: Vec::new(),
        })
    }

    /// Reads and parses as many complete lines as are currently available,
    /// starting from the last consumed position. Malformed lines and
    /// unknown event types are logged and skipped, not treated as fatal.
    pub async fn drain(&mut self, tx: &mpsc::Sender<Event>) -> Result<usize, ChannelError> {
        self.file
            .seek(std::io::SeekFrom::Start(self.pos))
            .await
            .map_err(|error| ChannelError::Read {
                path: self.path.clone(),
                error,
            })?;

        let mut chunk = Vec::new();
        self.file
            .read_to_end(&mut chunk)
            .await
            .map_err(|error| ChannelError::Read {
                path: self.path.clone(),
                error,
            })?;
        self.pos += chunk.len() as u64;
        self.pending.append(&mut chunk);

        let mut delivered = 0;
        // Split off complete lines, leaving any trailing partial line in
        // `pending` for the next drain.
        while let Some(newline_idx) = self.pending.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.pending.drain(..=newline_idx).collect();
            let line = &line_bytes[..line_bytes.len() - 1]; // strip the LF
            match std::str::from_utf8(line) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => match Event::from_line(text) {
                    Ok(event) => {
                        if matches!(event, Event::RunComplete) {
                            tracing::trace!("received runComplete marker");
                        }
                        if tx.send(event).await.is_err() {
                            // Dispatcher has gone away; nothing more to do.
                            break;
                        }
                        delivered += 1;
                    }
                    Err(error) => {
                        tracing::debug!(%error, line = text, "skipping malformed or unknown event channel line");
                    }
                },
                Err(error) => {
                    tracing::debug!(%error, "skipping non-UTF-8 event channel line");
                }
            }
        }

        Ok(delivered)
    }

    /// Runs the reader's full lifecycle: an initial drain, then react to
    /// filesystem notifications until `shutdown` fires, then the mandatory
    /// drain -> close-watcher -> drain-once-more -> close-file sequence.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<Event>,
        mut shutdown: tokio::sync::oneshot::Receiver<()>,
    ) -> Result<(), ChannelError> {
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(256);
        let mut watcher = build_watcher(&self.path, notify_tx)?;

        // Initial drain in case events were written before the watcher was
        // armed.
        self.drain(&tx).await?;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                notified = notify_rx.recv() => {
                    if notified.is_none() {
                        // Watcher's sender was dropped, e.g. on watch error.
                        break;
                    }
                    self.drain(&tx).await?;
                }
            }
        }

        // Mandatory ordering: drain, close watcher, drain once more, close
        // file. The second drain catches events appended between the
        // child's exit and this point.
        self.drain(&tx).await?;
        if let Err(error) = watcher.unwatch(self.path.as_std_path()) {
            tracing::debug!(%error, path = %self.path, "error while unwatching event channel (continuing)");
        }
        drop(watcher);
        self.drain(&tx).await?;

        Ok(())
    }
}

fn build_watcher(
    path: &Utf8Path,
    notify_tx: mpsc::Sender<()>,
) -> Result<RecommendedWatcher, ChannelError> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(_) => {
                let _ = notify_tx.blocking_send(());
            }
            Err(error) => {
                tracing::debug!(%error, "event channel watcher error");
            }
        }
    })
    .map_err(|error| ChannelError::Watch {
        path: path.to_owned(),
        error,
    })?;

    watcher
        .watch(path.as_std_path(), RecursiveMode::NonRecursive)
        .map_err(|error| ChannelError::Watch {
            path: path.to_owned(),
            error,
        })?;

    Ok(watcher)
}
