//! The composite stream: a file's content and its changes behind one handle.

use crate::content::ContentSource;
use crate::error::{Error, Result};
use crate::event::{Chunk, Event};
use crate::options::{Mode, StreamOptions};
use crate::source::Source;
use crate::watcher::WatchSource;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::future::poll_fn;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// A readable stream over a file that also reports changes to that file.
///
/// Content arrives as [`Event::Data`] chunks framed by `Open`, `End` and
/// `Close`; modifications arrive as [`Event::Change`]; failures from either
/// side arrive as [`Event::Error`]. Dropping the stream or calling
/// [`close`](Self::close) releases both the file handle and the watch.
pub struct ReadStreamWatcher {
    path: PathBuf,
    options: StreamOptions,
    content: Option<ContentSide>,
    watch: Option<Box<dyn Source>>,
    pending: VecDeque<Event>,
    lifecycle: Lifecycle,
    watch_first: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Active,
    /// Content is exhausted and nothing more will be watched.
    Finished,
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Content,
    Watch,
}

/// How content reaches the composite.
enum ContentSide {
    /// A pump task forwards the reader's events into this bounded buffer.
    Piped(mpsc::Receiver<Event>),
    /// The reader is polled in place.
    Direct(Box<dyn Source>),
}

impl ContentSide {
    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        match self {
            ContentSide::Piped(buffer) => buffer.poll_recv(cx),
            ContentSide::Direct(source) => source.poll_next_unpin(cx),
        }
    }

    fn close(&mut self) {
        match self {
            ContentSide::Piped(buffer) => buffer.close(),
            ContentSide::Direct(source) => source.close(),
        }
    }
}

impl ReadStreamWatcher {
    /// Opens the file for reading and subscribes to its changes.
    ///
    /// Only argument problems are reported here. A missing file, permission
    /// problems and anything else the OS reports come out of the stream as
    /// [`Event::Error`].
    pub fn new<P: AsRef<Path>>(path: P, options: StreamOptions) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::invalid_argument(
                "watch_file requires a non-empty path",
            ));
        }
        options.validate()?;
        let runtime = runtime_for(options.mode)?;

        let content: Box<dyn Source> = Box::new(ContentSource::new(path, &options));
        let watch = WatchSource::open(path).map(|watch| Box::new(watch) as Box<dyn Source>);

        Ok(Self::from_sources(path, options, runtime, content, watch))
    }

    /// Wires already-constructed sides together and reconciles a failed watch.
    ///
    /// With a runtime the content is pumped into a bounded buffer on it,
    /// without one the content source is polled in place.
    pub(crate) fn from_sources(
        path: &Path,
        options: StreamOptions,
        runtime: Option<Handle>,
        content: Box<dyn Source>,
        watch: Result<Box<dyn Source>>,
    ) -> Self {
        let path = path.to_path_buf();

        let content = match runtime {
            Some(runtime) => {
                let (tx, rx) = mpsc::channel(options.buffer_capacity);
                runtime.spawn(pump(content, tx, path.clone()));
                ContentSide::Piped(rx)
            }
            None => ContentSide::Direct(content),
        };

        let mut pending = VecDeque::new();
        let watch = match watch {
            Ok(watch) => Some(watch),
            // The reader fails the same way and reports it.
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path.display(), "watch not started: {e}");
                None
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), "deferring watch error: {e}");
                pending.push_back(Event::Error(e));
                None
            }
        };

        Self {
            path,
            options,
            content: Some(content),
            watch,
            pending,
            lifecycle: Lifecycle::Active,
            watch_first: false,
        }
    }

    /// The path being read and watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }

    /// Reads the next chunk of content.
    ///
    /// Returns `None` once the content is exhausted or the stream is closed.
    /// Only the content side is driven; its `Open`, `End` and `Close` events
    /// are kept for the event stream, and change events stay queued there too.
    pub async fn read(&mut self) -> Option<Result<Chunk>> {
        poll_fn(|cx| self.poll_read(cx)).await
    }

    fn poll_read(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Chunk>>> {
        if self.lifecycle == Lifecycle::Closed {
            return Poll::Ready(None);
        }

        loop {
            let Some(content) = self.content.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(content.poll_event(cx)) {
                Some(Event::Data(chunk)) => return Poll::Ready(Some(Ok(chunk))),
                Some(Event::Error(e)) => return Poll::Ready(Some(Err(e))),
                Some(Event::End) => {
                    self.pending.push_back(Event::End);
                    return Poll::Ready(None);
                }
                Some(event) => self.pending.push_back(event),
                None => {
                    self.content = None;
                    return Poll::Ready(None);
                }
            }
        }
    }

    /// Copies the remaining content into `destination`, returning the number
    /// of bytes written. With `end` the destination is shut down afterwards,
    /// otherwise it is only flushed so more can be written to it.
    pub async fn pipe<W>(&mut self, destination: &mut W, end: bool) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if self.is_closed() {
            return Err(Error::StreamClosed);
        }

        let mut written = 0u64;
        while let Some(chunk) = self.read().await {
            let chunk = chunk?;
            destination
                .write_all(chunk.as_bytes())
                .await
                .map_err(Error::Pipe)?;
            written += chunk.len() as u64;
        }

        if end {
            destination.shutdown().await.map_err(Error::Pipe)?;
        } else {
            destination.flush().await.map_err(Error::Pipe)?;
        }

        Ok(written)
    }

    /// Releases the file handle and the watch. Safe to call repeatedly and
    /// when either side never opened. No `Close` event is produced by this.
    pub fn close(&mut self) {
        if self.lifecycle == Lifecycle::Closed {
            return;
        }

        // Piped content only loses its buffer here; the pump then closes the reader.
        if let Some(mut content) = self.content.take() {
            content.close();
        }
        if let Some(mut watch) = self.watch.take() {
            watch.close();
        }
        self.pending.clear();
        self.lifecycle = Lifecycle::Closed;

        tracing::debug!(path = %self.path.display(), mode = %self.options.mode, "stream closed");
    }

    fn poll_side(&mut self, side: Side, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        match side {
            Side::Content => {
                let Some(content) = self.content.as_mut() else {
                    return Poll::Ready(None);
                };
                let polled = content.poll_event(cx);
                if let Poll::Ready(None) = polled {
                    self.content = None;
                }
                polled
            }
            Side::Watch => {
                let Some(watch) = self.watch.as_mut() else {
                    return Poll::Ready(None);
                };
                let polled = watch.poll_next_unpin(cx);
                if let Poll::Ready(None) = polled {
                    self.watch = None;
                }
                polled
            }
        }
    }

    fn finish(&mut self) {
        if let Some(mut watch) = self.watch.take() {
            watch.close();
        }
        self.lifecycle = Lifecycle::Finished;
        tracing::debug!(path = %self.path.display(), "stream finished");
    }
}

impl Stream for ReadStreamWatcher {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.lifecycle != Lifecycle::Active {
            return Poll::Ready(None);
        }
        if let Some(event) = this.pending.pop_front() {
            return Poll::Ready(Some(event));
        }

        // Alternate so a busy reader cannot starve change notifications.
        let watch_first = this.watch_first;
        this.watch_first = !watch_first;
        let sides = if watch_first {
            [Side::Watch, Side::Content]
        } else {
            [Side::Content, Side::Watch]
        };

        for side in sides {
            if let Poll::Ready(Some(event)) = this.poll_side(side, cx) {
                return Poll::Ready(Some(event));
            }
        }

        if this.content.is_none() && (this.watch.is_none() || !this.options.persistent) {
            this.finish();
            return Poll::Ready(None);
        }

        Poll::Pending
    }
}

impl fmt::Debug for ReadStreamWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadStreamWatcher")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("lifecycle", &self.lifecycle)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Drop for ReadStreamWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// The runtime a pass-through pump is spawned on. Decorated streams need none.
fn runtime_for(mode: Mode) -> Result<Option<Handle>> {
    match mode {
        Mode::PassThrough => Ok(Some(Handle::try_current()?)),
        Mode::Decorated => Ok(None),
    }
}

/// Forwards reader events into the pass-through buffer until the reader is
/// exhausted or the buffer is closed. The bounded send is what pauses reading.
async fn pump(mut source: Box<dyn Source>, buffer: mpsc::Sender<Event>, path: PathBuf) {
    loop {
        tokio::select! {
            _ = buffer.closed() => {
                source.close();
                break;
            }
            event = source.next() => match event {
                Some(event) => {
                    if buffer.send(event).await.is_err() {
                        source.close();
                        break;
                    }
                }
                None => break,
            }
        }
    }

    tracing::trace!(path = %path.display(), "content pump finished");
}
