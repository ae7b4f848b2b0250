// src/output/multipane/mod.rs

//! Multi-pane live display backend.
//!
//! The display surface is owned by a dedicated render thread. Producers never
//! touch it: every line is sent as a [`PaneUpdate`] on one unbounded queue and
//! the render loop applies updates one at a time. Once the loop has ended,
//! writers fall back to plain stdout/stderr.

pub mod layout;
pub mod region;
pub mod surface;

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use colored::{Color, Colorize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::output::palette::{PanelAppearance, pane_color};
use crate::output::{BaseWriter, LineWriter};

pub use layout::{grid_dimensions, region_names};
pub use region::{PaneInput, PaneLine, PaneSet, PaneUpdate, Region};
pub use surface::{PaneSurface, TerminalSurface};

/// How long the render loop waits for input before checking the queue again.
const INPUT_POLL: Duration = Duration::from_millis(50);

const BASE_PREFIX: &str = "[procmux] ";

pub struct MultiPaneRouter {
    regions: Arc<HashMap<String, usize>>,
    base_region: usize,
    updates: UnboundedSender<PaneUpdate>,
    stop: CancellationToken,
    finished: CancellationToken,
}

impl MultiPaneRouter {
    /// Take over the terminal and start rendering.
    pub fn start(
        base_name: &str,
        command_names: &[String],
        styles: &HashMap<String, PanelAppearance>,
    ) -> io::Result<Self> {
        let surface = TerminalSurface::init()?;
        Self::with_surface(surface, base_name, command_names, styles)
    }

    /// Start rendering onto an arbitrary surface.
    pub fn with_surface<S>(
        surface: S,
        base_name: &str,
        command_names: &[String],
        styles: &HashMap<String, PanelAppearance>,
    ) -> io::Result<Self>
    where
        S: PaneSurface + Send + 'static,
    {
        let names = region_names(base_name, command_names);
        let regions: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        let base_region = regions.get(base_name).copied().unwrap_or(0);
        let panes = PaneSet::new(&names, styles);

        let (updates, rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let finished = CancellationToken::new();

        {
            let stop = stop.clone();
            let finished = finished.clone();
            thread::Builder::new()
                .name("procmux-render".to_string())
                .spawn(move || {
                    let result = render_loop(surface, panes, rx, &stop);
                    // The surface is dropped (terminal restored) before waiters wake.
                    finished.cancel();
                    match result {
                        Ok(()) => debug!("render loop finished"),
                        Err(e) => warn!(error = %e, "render loop failed"),
                    }
                })?;
        }

        Ok(Self {
            regions: Arc::new(regions),
            base_region,
            updates,
            stop,
            finished,
        })
    }

    fn region_for(&self, name: &str) -> usize {
        self.regions.get(name).copied().unwrap_or(self.base_region)
    }

    pub fn base_writer(&self) -> BaseWriter {
        BaseWriter::Pane(PaneWriter {
            updates: self.updates.clone(),
            region: self.base_region,
            prefix: BASE_PREFIX.to_string(),
            prefix_color: Some(Color::BrightCyan),
        })
    }

    pub fn line_writer(&self, name: &str, color: Option<Color>, prefix: &str) -> LineWriter {
        let region = self.region_for(name);
        let updates = self.updates.clone();
        let prefix = prefix.to_string();
        Arc::new(move |line: &str| {
            let pane_line = PaneLine::new(prefix.clone(), color.map(pane_color), line);
            if let Err(mpsc::error::SendError(PaneUpdate::Append { line, .. })) =
                updates.send(PaneUpdate::Append { region, line: pane_line })
            {
                fallback_line(&mut io::stdout(), &line, color);
            }
        })
    }

    /// Completion is tied to the render loop, not to producers.
    pub fn add(&self) {}

    pub fn done(&self) {}

    /// Until the render loop has terminated.
    pub async fn wait(&self) {
        self.finished.cancelled().await
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }
}

/// System-log writer targeting the base region.
#[derive(Clone)]
pub struct PaneWriter {
    updates: UnboundedSender<PaneUpdate>,
    region: usize,
    prefix: String,
    prefix_color: Option<Color>,
}

impl PaneWriter {
    fn send_line(&self, text: &str) {
        let line = PaneLine::new(self.prefix.clone(), self.prefix_color.map(pane_color), text);
        if let Err(mpsc::error::SendError(PaneUpdate::Append { line, .. })) =
            self.updates.send(PaneUpdate::Append {
                region: self.region,
                line,
            })
        {
            fallback_line(&mut io::stderr(), &line, None);
        }
    }
}

impl Write for PaneWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let decoded = String::from_utf8_lossy(buf);
        let text = decoded.strip_suffix('\n').unwrap_or(decoded.as_ref());
        for line in text.split('\n') {
            self.send_line(line.strip_suffix('\r').unwrap_or(line));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn fallback_line(out: &mut impl Write, line: &PaneLine, color: Option<Color>) {
    let prefix = match color {
        Some(c) if !line.prefix.is_empty() => line.prefix.as_str().color(c).to_string(),
        _ => line.prefix.clone(),
    };
    let _ = writeln!(out, "{prefix}{}", line.text);
}

/// Apply queued updates and redraw until stopped or the user quits.
fn render_loop<S: PaneSurface>(
    mut surface: S,
    mut panes: PaneSet,
    mut updates: UnboundedReceiver<PaneUpdate>,
    stop: &CancellationToken,
) -> io::Result<()> {
    surface.draw(&panes)?;

    loop {
        if stop.is_cancelled() {
            return Ok(());
        }

        let mut dirty = false;
        loop {
            match updates.try_recv() {
                Ok(update) => {
                    panes.apply(update);
                    dirty = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if dirty {
            surface.draw(&panes)?;
        }

        match surface.next_input(INPUT_POLL)? {
            Some(PaneInput::Quit) => {
                debug!("quit requested from the display");
                return Ok(());
            }
            Some(input) => {
                panes.handle_input(input);
                surface.draw(&panes)?;
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records the last drawn state; quits when told to.
    #[derive(Clone, Default)]
    struct RecordingSurface {
        last: Arc<Mutex<Option<PaneSet>>>,
        quit: Arc<AtomicBool>,
    }

    impl RecordingSurface {
        fn lines_of(&self, name: &str) -> Vec<String> {
            self.last
                .lock()
                .unwrap()
                .as_ref()
                .and_then(|p| p.region(name).map(|r| r.lines().map(PaneLine::plain).collect()))
                .unwrap_or_default()
        }
    }

    impl PaneSurface for RecordingSurface {
        fn draw(&mut self, panes: &PaneSet) -> io::Result<()> {
            *self.last.lock().unwrap() = Some(panes.clone());
            Ok(())
        }

        fn next_input(&mut self, timeout: Duration) -> io::Result<Option<PaneInput>> {
            if self.quit.load(Ordering::SeqCst) {
                return Ok(Some(PaneInput::Quit));
            }
            thread::sleep(timeout.min(Duration::from_millis(5)));
            Ok(None)
        }
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    fn router(surface: RecordingSurface, names: &[&str]) -> MultiPaneRouter {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        MultiPaneRouter::with_surface(surface, "procmux", &names, &HashMap::new()).unwrap()
    }

    #[tokio::test]
    async fn lines_land_in_their_region() {
        let surface = RecordingSurface::default();
        let r = router(surface.clone(), &["web", "db"]);

        let web = r.line_writer("web", None, "");
        let db_err = r.line_writer("db", Some(Color::Red), "[stderr] ");
        web("listening");
        db_err("\x1b[1mboom\x1b[0m");

        eventually(|| surface.lines_of("db").len() == 1).await;
        assert_eq!(surface.lines_of("web"), vec!["listening"]);
        assert_eq!(surface.lines_of("db"), vec!["[stderr] boom"]);

        r.stop();
        tokio::time::timeout(Duration::from_secs(1), r.wait()).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_name_and_base_writer_use_base_region() {
        let surface = RecordingSurface::default();
        let r = router(surface.clone(), &["web"]);

        r.line_writer("ghost", None, "[setup:ghost] ")("hi");
        let mut base = r.base_writer();
        base.write_all(b"first\nsecond\n").unwrap();

        eventually(|| surface.lines_of("procmux").len() == 3).await;
        assert_eq!(
            surface.lines_of("procmux"),
            vec!["[setup:ghost] hi", "[procmux] first", "[procmux] second"]
        );
        r.stop();
        r.wait().await;
    }

    #[tokio::test]
    async fn command_named_like_base_shares_one_region() {
        let surface = RecordingSurface::default();
        let r = router(surface.clone(), &["procmux", "web"]);
        r.line_writer("procmux", None, "")("from command");
        eventually(|| surface.lines_of("procmux").len() == 1).await;
        let regions = surface.last.lock().unwrap().as_ref().unwrap().regions().len();
        assert_eq!(regions, 2);
        r.stop();
        r.wait().await;
    }

    #[tokio::test]
    async fn quit_from_display_ends_wait() {
        let surface = RecordingSurface::default();
        let r = router(surface.clone(), &["web"]);
        assert!(!r.is_finished());
        surface.quit.store(true, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(1), r.wait())
            .await
            .expect("quitting the display ends the render loop");
        assert!(r.is_finished());

        // Writes after the loop ended must not panic.
        r.line_writer("web", None, "")("late line");
    }
}
