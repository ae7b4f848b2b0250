// src/exec/stream.rs

//! Forward a child's output streams line by line.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::output::LineWriter;

/// Spawn a task that reads `reader` until EOF.
///
/// Complete lines (without `\n` / `\r\n`) go to `writer`. Without a writer
/// the stream is still drained so the child never blocks on a full pipe.
pub fn spawn_line_stream<R>(
    reader: R,
    writer: Option<LineWriter>,
    command: String,
    stream: &'static str,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        match writer {
            Some(writer) => forward_lines(reader, writer, &command, stream).await,
            None => {
                let mut reader = reader;
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    debug!(command = %command, stream, error = %e, "discarding output failed");
                }
            }
        }
        debug!(command = %command, stream, "output stream closed");
    })
}

async fn forward_lines<R>(reader: R, writer: LineWriter, command: &str, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = trim_line_ending(&buf);
                writer(&String::from_utf8_lossy(line));
            }
            Err(e) => {
                debug!(command = %command, stream, error = %e, "error reading output");
                break;
            }
        }
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
