//! Sequential, chunked reading of a file's current contents.

use crate::decoder::TextDecoder;
use crate::error::Error;
use crate::event::{Chunk, Descriptor, Event};
use crate::options::StreamOptions;
use crate::source::Source;
use futures::Stream;
use std::collections::VecDeque;
use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, ReadBuf};

type OpenFuture = Pin<Box<dyn Future<Output = io::Result<File>> + Send>>;

enum ReadState {
    Opening(OpenFuture),
    Reading { file: File, descriptor: Descriptor },
    Done,
}

enum Step {
    Opened(io::Result<File>),
    Read(Vec<u8>),
    Eof(Descriptor),
    Failed(io::Error, Descriptor),
}

/// Reads a file from `start` to `end` (or EOF), yielding `Open`, `Data`,
/// `End` and `Close` events. Closes itself once the content is exhausted.
pub(crate) struct ContentSource {
    path: PathBuf,
    state: ReadState,
    decoder: Option<TextDecoder>,
    remaining: Option<u64>,
    chunk_size: usize,
    /// Grown on demand, never past `chunk_size` or what is left to read.
    buf: Vec<u8>,
    queued: VecDeque<Event>,
}

impl ContentSource {
    /// Prepares the reader. The file is opened on first poll.
    pub(crate) fn new<P: AsRef<Path>>(path: P, options: &StreamOptions) -> Self {
        let path = path.as_ref().to_path_buf();
        let open_path = path.clone();
        let start = options.start.unwrap_or(0);

        let open: OpenFuture = Box::pin(async move {
            let mut file = File::open(&open_path).await?;
            if start > 0 {
                file.seek(SeekFrom::Start(start)).await?;
            }
            Ok(file)
        });

        Self {
            path,
            state: ReadState::Opening(open),
            decoder: options.encoding.map(TextDecoder::new),
            remaining: options.read_limit(),
            chunk_size: options.high_water_mark,
            buf: Vec::new(),
            queued: VecDeque::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn on_opened(&mut self, result: io::Result<File>) -> Option<Event> {
        match result {
            Ok(file) => {
                let descriptor = Descriptor::of(&file);
                tracing::trace!(path = %self.path.display(), fd = descriptor.raw(), "opened file for reading");
                self.state = ReadState::Reading { file, descriptor };
                Some(Event::Open(descriptor))
            }
            Err(e) => {
                self.state = ReadState::Done;
                Some(Event::Error(Error::Io(e)))
            }
        }
    }

    fn on_read(&mut self, bytes: Vec<u8>) -> Option<Event> {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(bytes.len() as u64);
        }

        let chunk = match self.decoder.as_mut() {
            Some(decoder) => {
                let text = decoder.decode(&bytes);
                if text.is_empty() {
                    return None;
                }
                Chunk::Text(text)
            }
            None => Chunk::Bytes(bytes),
        };
        Some(Event::Data(chunk))
    }

    fn on_eof(&mut self, descriptor: Descriptor) {
        if let Some(text) = self.decoder.as_mut().and_then(TextDecoder::finish) {
            self.queued.push_back(Event::Data(Chunk::Text(text)));
        }
        self.queued.push_back(Event::End);
        self.queued.push_back(Event::Close(descriptor));
        self.state = ReadState::Done;
    }

    fn on_failed(&mut self, error: io::Error, descriptor: Descriptor) {
        self.queued.push_back(Event::Error(Error::Io(error)));
        self.queued.push_back(Event::Close(descriptor));
        self.state = ReadState::Done;
    }
}

impl Source for ContentSource {
    fn close(&mut self) {
        self.state = ReadState::Done;
        self.queued.clear();
    }
}

impl Stream for ContentSource {
    type Item = Event;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.queued.pop_front() {
                return Poll::Ready(Some(event));
            }

            let step = match &mut this.state {
                ReadState::Opening(open) => Step::Opened(ready!(open.as_mut().poll(cx))),
                ReadState::Reading { file, descriptor } => {
                    let want = next_read_len(this.chunk_size, this.remaining);
                    if want == 0 {
                        Step::Eof(*descriptor)
                    } else {
                        if this.buf.len() < want {
                            this.buf.resize(want, 0);
                        }
                        let mut read_buf = ReadBuf::new(&mut this.buf[..want]);
                        match ready!(Pin::new(file).poll_read(cx, &mut read_buf)) {
                            Ok(()) if read_buf.filled().is_empty() => Step::Eof(*descriptor),
                            Ok(()) => Step::Read(read_buf.filled().to_vec()),
                            Err(e) => Step::Failed(e, *descriptor),
                        }
                    }
                }
                ReadState::Done => return Poll::Ready(None),
            };

            let event = match step {
                Step::Opened(result) => this.on_opened(result),
                Step::Read(bytes) => this.on_read(bytes),
                Step::Eof(descriptor) => {
                    this.on_eof(descriptor);
                    None
                }
                Step::Failed(error, descriptor) => {
                    this.on_failed(error, descriptor);
                    None
                }
            };

            if let Some(event) = event {
                return Poll::Ready(Some(event));
            }
        }
    }
}

/// Size of the next read given the chunk size and any bytes left before `end`.
fn next_read_len(chunk_size: usize, remaining: Option<u64>) -> usize {
    match remaining {
        Some(remaining) => remaining.min(chunk_size as u64) as usize,
        None => chunk_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Encoding;
    use crate::error::ErrorCode;
    use crate::options::MAX_HIGH_WATER_MARK;
    use crate::test_helpers::TempFile;
    use std::time::Duration;
    use tokio_stream::StreamExt;

    async fn drain(source: &mut ContentSource) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(5), source.next()).await
        {
            events.push(event);
        }
        events
    }

    fn data_bytes(events: &[Event]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Data(chunk) => Some(chunk.as_bytes().to_vec()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn test_next_read_len() {
        assert_eq!(next_read_len(64, None), 64);
        assert_eq!(next_read_len(64, Some(10)), 10);
        assert_eq!(next_read_len(64, Some(100)), 64);
        assert_eq!(next_read_len(64, Some(0)), 0);
        assert_eq!(next_read_len(8, Some(u64::MAX)), 8);
    }

    #[test]
    fn test_new_does_not_touch_the_filesystem() {
        let source = ContentSource::new("/definitely/not/here.txt", &StreamOptions::default());
        assert_eq!(source.path(), Path::new("/definitely/not/here.txt"));
        assert!(source.buf.is_empty());
    }

    #[tokio::test]
    async fn test_buffer_sized_by_range_not_high_water_mark() {
        let temp_file = TempFile::with_content("0123456789").unwrap();
        let options = StreamOptions::new()
            .with_high_water_mark(MAX_HIGH_WATER_MARK)
            .with_start(2)
            .with_end(5);
        let mut source = ContentSource::new(temp_file.path(), &options);

        let events = drain(&mut source).await;

        assert_eq!(data_bytes(&events), b"2345");
        assert_eq!(source.buf.len(), 4);
    }

    #[tokio::test]
    async fn test_reads_whole_file_in_order() {
        let temp_file = TempFile::with_content("test file content").unwrap();
        let mut source = ContentSource::new(temp_file.path(), &StreamOptions::default());

        let events = drain(&mut source).await;

        assert!(matches!(events.first(), Some(Event::Open(_))));
        assert!(matches!(events[events.len() - 2], Event::End));
        assert!(matches!(events.last(), Some(Event::Close(_))));
        assert_eq!(data_bytes(&events), b"test file content");
    }

    #[tokio::test]
    async fn test_open_and_close_share_descriptor() {
        let temp_file = TempFile::with_content("abc").unwrap();
        let mut source = ContentSource::new(temp_file.path(), &StreamOptions::default());

        let events = drain(&mut source).await;

        let opened = match events.first() {
            Some(Event::Open(descriptor)) => *descriptor,
            other => panic!("Expected Open, got {:?}", other),
        };
        let closed = match events.last() {
            Some(Event::Close(descriptor)) => *descriptor,
            other => panic!("Expected Close, got {:?}", other),
        };
        assert_eq!(opened, closed);
    }

    #[tokio::test]
    async fn test_high_water_mark_limits_chunk_size() {
        let temp_file = TempFile::with_content("0123456789").unwrap();
        let options = StreamOptions::new().with_high_water_mark(4);
        let mut source = ContentSource::new(temp_file.path(), &options);

        let events = drain(&mut source).await;

        for event in &events {
            if let Event::Data(chunk) = event {
                assert!(chunk.len() <= 4);
            }
        }
        assert_eq!(data_bytes(&events), b"0123456789");
    }

    #[tokio::test]
    async fn test_start_and_end_are_inclusive() {
        let temp_file = TempFile::with_content("0123456789").unwrap();
        let options = StreamOptions::new()
            .with_start(2)
            .with_end(5)
            .with_high_water_mark(3);
        let mut source = ContentSource::new(temp_file.path(), &options);

        let events = drain(&mut source).await;

        assert_eq!(data_bytes(&events), b"2345");
    }

    #[tokio::test]
    async fn test_end_past_eof_reads_to_eof() {
        let temp_file = TempFile::with_content("short").unwrap();
        let options = StreamOptions::new().with_end(1000);
        let mut source = ContentSource::new(temp_file.path(), &options);

        let events = drain(&mut source).await;

        assert_eq!(data_bytes(&events), b"short");
        assert!(matches!(events.last(), Some(Event::Close(_))));
    }

    #[tokio::test]
    async fn test_utf8_text_across_small_chunks() {
        let content = "Hello 世界 🦀";
        let temp_file = TempFile::with_content(content).unwrap();
        let options = StreamOptions::new()
            .with_encoding(Encoding::Utf8)
            .with_high_water_mark(3);
        let mut source = ContentSource::new(temp_file.path(), &options);

        let events = drain(&mut source).await;

        let text: String = events
            .iter()
            .filter_map(|event| match event {
                Event::Data(Chunk::Text(text)) => Some(text.as_str()),
                Event::Data(Chunk::Bytes(_)) => panic!("Expected decoded text"),
                _ => None,
            })
            .collect();
        assert_eq!(text, content);
    }

    #[tokio::test]
    async fn test_empty_file_yields_no_data() {
        let temp_file = TempFile::new().unwrap();
        let mut source = ContentSource::new(temp_file.path(), &StreamOptions::default());

        let events = drain(&mut source).await;

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Event::Open(_)));
        assert!(matches!(events[1], Event::End));
        assert!(matches!(events[2], Event::Close(_)));
    }

    #[tokio::test]
    async fn test_nonexistent_file_reports_single_not_found() {
        let temp_file = TempFile::new().unwrap();
        let missing = temp_file.sibling("missing.txt");
        let mut source = ContentSource::new(&missing, &StreamOptions::default());

        let events = drain(&mut source).await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Error(e) => assert_eq!(e.code(), ErrorCode::NotFound),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_before_open_yields_nothing() {
        let temp_file = TempFile::with_content("never read").unwrap();
        let mut source = ContentSource::new(temp_file.path(), &StreamOptions::default());

        source.close();
        source.close();

        assert!(source.next().await.is_none());
    }

    #[tokio::test]
    async fn test_close_mid_stream_drops_queued_events() {
        let temp_file = TempFile::with_content("0123456789").unwrap();
        let options = StreamOptions::new().with_high_water_mark(2);
        let mut source = ContentSource::new(temp_file.path(), &options);

        assert!(matches!(source.next().await, Some(Event::Open(_))));
        assert!(matches!(source.next().await, Some(Event::Data(_))));

        source.close();

        assert!(source.next().await.is_none());
    }
}
