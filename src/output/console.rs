// src/output/console.rs

//! Plain console backend.

use std::io::{self, Write};
use std::sync::Arc;

use colored::{Color, Colorize};
use tokio::sync::watch;

use super::{BaseWriter, LineWriter, SharedStream};

/// Prefixed lines on one shared stdout; system log on stderr.
pub struct ConsoleRouter {
    out: SharedStream,
    err: SharedStream,
    producers: watch::Sender<usize>,
}

impl ConsoleRouter {
    pub fn new() -> Self {
        Self::with_streams(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Route command output to `out` and the system log to `err`.
    pub fn with_streams(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        let (producers, _) = watch::channel(0usize);
        Self {
            out: SharedStream::new(out),
            err: SharedStream::new(err),
            producers,
        }
    }

    pub fn base_writer(&self) -> BaseWriter {
        BaseWriter::Console(self.err.clone())
    }

    pub fn line_writer(&self, _name: &str, color: Option<Color>, prefix: &str) -> LineWriter {
        let prefix = colorize_prefix(prefix, color);
        let out = self.out.clone();
        Arc::new(move |line: &str| {
            let mut buf = String::with_capacity(prefix.len() + line.len() + 1);
            buf.push_str(&prefix);
            buf.push_str(line);
            buf.push('\n');
            // A closed stdout (e.g. `| head`) must not take the supervisor down.
            let _ = out.write_atomic(buf.as_bytes());
        })
    }

    pub fn add(&self) {
        self.producers.send_modify(|n| *n += 1);
    }

    pub fn done(&self) {
        self.producers.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub fn active(&self) -> usize {
        *self.producers.borrow()
    }

    pub async fn wait(&self) {
        let mut rx = self.producers.subscribe();
        // The sender lives in `self`, so this only returns once the count is zero.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Nothing to tear down for a plain stream.
    pub fn stop(&self) {}
}

impl Default for ConsoleRouter {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn colorize_prefix(prefix: &str, color: Option<Color>) -> String {
    match color {
        Some(c) if !prefix.is_empty() => prefix.color(c).to_string(),
        _ => prefix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Buf(Arc<Mutex<Vec<u8>>>);

    impl Write for Buf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn line_writer_prefixes_each_line() {
        let out = Buf::default();
        let router = ConsoleRouter::with_streams(Box::new(out.clone()), Box::new(io::sink()));
        let w = router.line_writer("web", None, "[web] ");
        w("hello");
        w("world");
        assert_eq!(out.text(), "[web] hello\n[web] world\n");
    }

    #[test]
    fn base_writer_goes_to_err_stream() {
        let err = Buf::default();
        let router = ConsoleRouter::with_streams(Box::new(io::sink()), Box::new(err.clone()));
        let mut base = router.base_writer();
        base.write_all(b"system line\n").unwrap();
        assert_eq!(err.text(), "system line\n");
    }

    #[tokio::test]
    async fn wait_returns_after_last_done() {
        let router = Arc::new(ConsoleRouter::with_streams(
            Box::new(io::sink()),
            Box::new(io::sink()),
        ));
        router.add();
        router.add();
        router.done();

        let waiter = {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished(), "one producer is still active");

        router.done();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait should return once the counter is zero")
            .unwrap();
        assert_eq!(router.active(), 0);
    }

    #[tokio::test]
    async fn wait_with_no_producers_returns_immediately() {
        let router = ConsoleRouter::with_streams(Box::new(io::sink()), Box::new(io::sink()));
        tokio::time::timeout(Duration::from_millis(200), router.wait())
            .await
            .expect("no producers means nothing to wait for");
    }
}
