//! Test utilities: temporary files and a scripted stand-in for a sub-resource.

use crate::event::Event;
use crate::source::Source;
use futures::Stream;
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

pub struct TempFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TempFile {
    /// Create a new, empty temporary file for testing
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("test.txt");

        File::create(&path)?;

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary file with initial content
    pub fn with_content(content: &str) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        temp_file.write_content(content)?;
        Ok(temp_file)
    }

    /// Replace the file's content
    pub fn write_content(&self, content: &str) -> std::io::Result<()> {
        std::fs::write(&self.path, content)
    }

    /// A path next to this file that does not exist
    pub fn sibling(&self, name: &str) -> PathBuf {
        self._temp_dir.path().join(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A [`Source`] that replays a fixed list of events.
///
/// Once the script runs out it either ends or stays pending forever,
/// the way an idle watch subscription does.
pub(crate) struct ScriptedSource {
    events: VecDeque<Event>,
    stay_open: bool,
    closed: Arc<AtomicBool>,
    pulled: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub(crate) fn ending(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
            stay_open: false,
            closed: Arc::new(AtomicBool::new(false)),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn staying_open(events: Vec<Event>) -> Self {
        Self {
            stay_open: true,
            ..Self::ending(events)
        }
    }

    /// Flag that flips once `close` has been called.
    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Counter of events handed out so far.
    pub(crate) fn pulled_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pulled)
    }
}

impl Source for ScriptedSource {
    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.events.clear();
    }
}

impl Stream for ScriptedSource {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.closed.load(Ordering::SeqCst) {
            return Poll::Ready(None);
        }
        match self.events.pop_front() {
            Some(event) => {
                self.pulled.fetch_add(1, Ordering::SeqCst);
                Poll::Ready(Some(event))
            }
            None if self.stay_open => Poll::Pending,
            None => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_temp_file_creation() {
        let temp_file = TempFile::new().unwrap();
        assert!(temp_file.path().exists());
        assert!(!temp_file.sibling("other.txt").exists());
    }

    #[tokio::test]
    async fn test_temp_file_with_content() {
        let temp_file = TempFile::with_content("test line").unwrap();

        let file_content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(file_content, "test line");
    }

    #[tokio::test]
    async fn test_write_content_replaces_file() {
        let temp_file = TempFile::with_content("stale content").unwrap();

        temp_file.write_content("fresh").unwrap();
        assert_eq!(std::fs::read_to_string(temp_file.path()).unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_scripted_source_replays_and_ends() {
        let mut source = ScriptedSource::ending(vec![Event::End]);

        let pulled = source.pulled_counter();

        assert!(matches!(source.next().await, Some(Event::End)));
        assert!(source.next().await.is_none());
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scripted_source_close_sets_flag() {
        let mut source = ScriptedSource::staying_open(vec![Event::End]);
        let closed = source.closed_flag();

        source.close();

        assert!(closed.load(Ordering::SeqCst));
        assert!(source.next().await.is_none());
    }
}
