//! File watching functionality using the notify crate.

use crate::error::{Error, Result};
use crate::event::{ChangeKind, Event};
use crate::source::Source;
use futures::Stream;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::sync::mpsc;

/// An OS subscription to changes of a single file.
pub(crate) struct WatchSource {
    watcher: Option<RecommendedWatcher>,
    receiver: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    file_path: PathBuf,
    file_name: String,
}

impl WatchSource {
    /// Subscribes to changes of `path`. Fails right away if the OS refuses,
    /// most commonly because the file does not exist.
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&file_path, RecursiveMode::NonRecursive)?;

        tracing::trace!(path = %file_path.display(), "watching file");

        Ok(Self {
            watcher: Some(watcher),
            receiver: rx,
            file_path,
            file_name,
        })
    }

    #[cfg(test)]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl Source for WatchSource {
    fn close(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.file_path) {
                tracing::trace!(path = %self.file_path.display(), "unwatch failed: {e}");
            }
        }
        self.receiver.close();
    }
}

impl Stream for WatchSource {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(self.receiver.poll_recv(cx)) {
                Some(Ok(event)) => {
                    if !is_event_relevant_to_file(&event, &self.file_name) {
                        continue;
                    }
                    if let Some(kind) = ChangeKind::from_event_kind(&event.kind) {
                        return Poll::Ready(Some(Event::Change(kind, self.file_path.clone())));
                    }
                }
                Some(Err(e)) => return Poll::Ready(Some(Event::Error(Error::Watcher(e)))),
                None => return Poll::Ready(None),
            }
        }
    }
}

/// Check if a notify event is relevant to a specific file. Events without
/// paths come from a subscription on that file alone and always count.
pub(crate) fn is_event_relevant_to_file(event: &notify::Event, target_file_name: &str) -> bool {
    event.paths.is_empty()
        || event.paths.iter().any(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy() == target_file_name)
                .unwrap_or(false)
        })
}
