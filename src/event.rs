//! Events emitted by a [`ReadStreamWatcher`](crate::ReadStreamWatcher).

use crate::error::Error;
use notify::EventKind;
use notify::event::ModifyKind;
use std::fmt;
use std::path::PathBuf;

/// A notification from either the content side or the watch side.
#[derive(Debug)]
pub enum Event {
    /// The file was opened for reading.
    Open(Descriptor),
    /// The next piece of file content.
    Data(Chunk),
    /// All content has been read.
    End,
    /// The read handle was released.
    Close(Descriptor),
    /// The file changed on disk. Carries the watched path.
    Change(ChangeKind, PathBuf),
    /// A failure on either side.
    Error(Error),
}

/// A piece of file content, raw or decoded depending on the stream's encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Bytes(Vec<u8>),
    Text(String),
}

impl Chunk {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Chunk::Bytes(bytes) => bytes,
            Chunk::Text(text) => text.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What kind of change the watcher observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Content or metadata was modified.
    Change,
    /// The path was renamed, created or removed.
    Rename,
}

impl ChangeKind {
    /// Maps a notify event kind, or `None` for kinds that are not changes.
    pub(crate) fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Access(_) => None,
            EventKind::Create(_) | EventKind::Remove(_) => Some(ChangeKind::Rename),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
            _ => Some(ChangeKind::Change),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Change => write!(f, "change"),
            ChangeKind::Rename => write!(f, "rename"),
        }
    }
}

/// OS handle number of an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(u64);

impl Descriptor {
    #[cfg(unix)]
    pub(crate) fn of(file: &tokio::fs::File) -> Self {
        use std::os::fd::AsRawFd;
        Descriptor(file.as_raw_fd() as u64)
    }

    #[cfg(windows)]
    pub(crate) fn of(file: &tokio::fs::File) -> Self {
        use std::os::windows::io::AsRawHandle;
        Descriptor(file.as_raw_handle() as usize as u64)
    }

    #[cfg(not(any(unix, windows)))]
    pub(crate) fn of(_file: &tokio::fs::File) -> Self {
        Descriptor(0)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}
