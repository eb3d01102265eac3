//! Options accepted by [`watch_file`](crate::watch_file).

use crate::decoder::Encoding;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Default size of a single read, in bytes.
pub const DEFAULT_HIGH_WATER_MARK: usize = 64 * 1024;

/// Largest accepted high-water mark, in bytes.
pub const MAX_HIGH_WATER_MARK: usize = 1 << 30;

/// Default number of chunks the pass-through buffer holds before the reader pauses.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16;

/// How the content side is attached to the composite stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Content is pumped by a background task into an intermediary buffer.
    #[default]
    PassThrough,
    /// The composite polls the file reader directly.
    Decorated,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::PassThrough => write!(f, "pass-through"),
            Mode::Decorated => write!(f, "decorated"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pass-through" | "passthrough" => Ok(Mode::PassThrough),
            "decorated" => Ok(Mode::Decorated),
            other => Err(Error::invalid_argument(format!("unknown mode '{other}'"))),
        }
    }
}

/// Configuration shared by the content side and the watch side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Decode content as text. `None` yields raw bytes.
    pub encoding: Option<Encoding>,
    /// Keep the event stream open for changes after the content has been read.
    pub persistent: bool,
    /// Maximum bytes per read.
    pub high_water_mark: usize,
    /// Chunks buffered in pass-through mode before reading pauses.
    pub buffer_capacity: usize,
    /// Byte offset to start reading at.
    pub start: Option<u64>,
    /// Inclusive byte offset to stop reading at.
    pub end: Option<u64>,
    pub mode: Mode,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            persistent: true,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            start: None,
            end: None,
            mode: Mode::default(),
        }
    }
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = bytes;
        self
    }

    pub fn with_buffer_capacity(mut self, chunks: usize) -> Self {
        self.buffer_capacity = chunks;
        self
    }

    pub fn with_start(mut self, offset: u64) -> Self {
        self.start = Some(offset);
        self
    }

    pub fn with_end(mut self, offset: u64) -> Self {
        self.end = Some(offset);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Rejects combinations no reader could satisfy.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.high_water_mark == 0 {
            return Err(Error::invalid_argument("high_water_mark must be positive"));
        }
        if self.high_water_mark > MAX_HIGH_WATER_MARK {
            return Err(Error::invalid_argument(format!(
                "high_water_mark must not exceed {MAX_HIGH_WATER_MARK} bytes"
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(Error::invalid_argument("buffer_capacity must be positive"));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(Error::invalid_argument(format!(
                    "start ({start}) must not exceed end ({end})"
                )));
            }
        }
        Ok(())
    }

    /// Number of bytes the reader may hand out, if bounded by `end`.
    pub(crate) fn read_limit(&self) -> Option<u64> {
        self.end
            .map(|end| end.saturating_add(1).saturating_sub(self.start.unwrap_or(0)))
    }
}
