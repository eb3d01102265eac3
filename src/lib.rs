//! A readable file stream that also reports changes to the file it reads.
//!
//! [`watch_file`] opens a file for reading and subscribes to its changes in one
//! go. The returned [`ReadStreamWatcher`] yields the file's current content,
//! then keeps reporting modifications until it is closed or dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use readstream_watcher::{watch_file, Event};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut stream = watch_file("app.log", None)?;
//!
//!     while let Some(event) = stream.next().await {
//!         match event {
//!             Event::Data(chunk) => print!("{}", String::from_utf8_lossy(chunk.as_bytes())),
//!             Event::Change(kind, path) => eprintln!("{} {}", kind, path.display()),
//!             Event::Error(e) => eprintln!("Error: {}", e),
//!             _ => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

// Internal modules - not part of public API
mod content;
mod decoder;
mod error;
mod event;
mod options;
mod source;
mod stream;
mod watcher;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use decoder::Encoding;
pub use error::{Error, ErrorCode, Origin, Result};
pub use event::{ChangeKind, Chunk, Descriptor, Event};
pub use options::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_HIGH_WATER_MARK, MAX_HIGH_WATER_MARK, Mode, StreamOptions,
};
pub use stream::ReadStreamWatcher;

use std::path::Path;

/// Creates a stream that reads a file and watches it for changes.
///
/// Fails only for an empty path or out-of-range options (and, in the default
/// pass-through mode, when called outside a tokio runtime). Everything the OS
/// reports, including a missing file, arrives later as [`Event::Error`].
///
/// # Arguments
///
/// * `path` - File to read and watch
/// * `options` - Stream options (defaults when `None`)
///
/// # Example
///
/// ```rust,no_run
/// use readstream_watcher::{watch_file, Encoding, StreamOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let options = StreamOptions::new().with_encoding(Encoding::Utf8);
///     let mut stream = watch_file("app.log", Some(options))?;
///
///     while let Some(chunk) = stream.read().await {
///         print!("{}", String::from_utf8_lossy(chunk?.as_bytes()));
///     }
///
///     stream.close();
///     Ok(())
/// }
/// ```
pub fn watch_file<P: AsRef<Path>>(
    path: P,
    options: Option<StreamOptions>,
) -> Result<ReadStreamWatcher> {
    ReadStreamWatcher::new(path, options.unwrap_or_default())
}
