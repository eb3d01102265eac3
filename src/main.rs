use clap::Parser;
use readstream_watcher::{Encoding, Event, Mode, StreamOptions, watch_file};
use std::path::PathBuf;
use std::process;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Print a file's content, then report every change made to it.
#[derive(Parser, Debug)]
#[command(name = "readstream-watcher", version, about)]
struct Cli {
    /// File to read and watch
    path: PathBuf,

    /// Decode content as text (utf8, latin1)
    #[arg(long)]
    encoding: Option<Encoding>,

    /// Exit once the content has been printed instead of waiting for changes
    #[arg(long)]
    no_persistent: bool,

    /// How content is attached to the stream (pass-through, decorated)
    #[arg(long, default_value_t = Mode::PassThrough)]
    mode: Mode,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut options = StreamOptions::new()
        .persistent(!cli.no_persistent)
        .with_mode(cli.mode);
    if let Some(encoding) = cli.encoding {
        options = options.with_encoding(encoding);
    }

    let mut stream = match watch_file(&cli.path, Some(options)) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error setting up file watcher: {}", e);
            process::exit(1);
        }
    };

    let mut stdout = tokio::io::stdout();
    while let Some(event) = stream.next().await {
        match event {
            Event::Data(chunk) => {
                if let Err(e) = write_chunk(&mut stdout, chunk.as_bytes()).await {
                    eprintln!("Error writing output: {}", e);
                    process::exit(1);
                }
            }
            Event::Change(kind, path) => {
                tracing::info!(kind = %kind, path = %path.display(), "file changed");
            }
            Event::Open(fd) => tracing::debug!(fd = fd.raw(), "file opened"),
            Event::End => tracing::debug!("end of content"),
            Event::Close(fd) => tracing::debug!(fd = fd.raw(), "file closed"),
            Event::Error(e) => {
                tracing::error!(code = ?e.code(), "{e}");
                process::exit(1);
            }
        }
    }
}

/// Writes one chunk and flushes it through, so output shows up as it arrives.
async fn write_chunk<W: AsyncWrite + Unpin>(out: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(bytes).await?;
    out.flush().await
}
