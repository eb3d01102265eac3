use readstream_watcher::{Encoding, Event, StreamOptions, watch_file};
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Cargo.toml".to_string());

    // Read a file as text, then report the next couple of changes to it
    let options = StreamOptions::new().with_encoding(Encoding::Utf8);
    let mut stream = watch_file(&path, Some(options))?;

    println!("Reading and watching {} - edit it to see change events...", path);

    let mut changes = 0;
    while let Some(event) = stream.next().await {
        match event {
            Event::Data(chunk) => print!("{}", String::from_utf8_lossy(chunk.as_bytes())),
            Event::End => println!("\n--- end of current content ---"),
            Event::Change(kind, path) => {
                changes += 1;
                println!("Change #{}: {} {}", changes, kind, path.display());
                if changes >= 2 {
                    break;
                }
            }
            Event::Error(e) => {
                eprintln!("Error: {}", e);
                break;
            }
            Event::Open(_) | Event::Close(_) => {}
        }
    }

    stream.close();
    Ok(())
}
