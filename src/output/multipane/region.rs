// src/output/multipane/region.rs

//! In-memory state of the display: regions and the updates applied to them.
//!
//! Only the render thread owns a [`PaneSet`]; everything else talks to it
//! through [`PaneUpdate`]s on the queue.

use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use ansi_to_tui::IntoText;
use ratatui::style::Color as PaneColor;
use ratatui::text::Span;
use regex::Regex;

use crate::output::palette::PanelAppearance;

/// Lines kept per region.
pub const REGION_HISTORY: usize = 5000;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(\[[0-9;?]*[ -/]*[@-~]|\][^\x07\x1b]*(\x07|\x1b\\)|[@-Z\\-_])")
        .expect("ANSI escape pattern is valid")
});

/// Remove ANSI escape sequences.
pub fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    ANSI_ESCAPE.replace_all(s, "")
}

/// Turn SGR colour codes in `raw` into styled spans. Anything the converter
/// rejects is shown as plain text with the escapes removed.
pub fn styled_spans(raw: &str) -> Vec<Span<'static>> {
    if !raw.contains('\x1b') {
        return vec![Span::raw(raw.to_string())];
    }
    match raw.into_text() {
        Ok(text) => text.lines.into_iter().flat_map(|line| line.spans).collect(),
        Err(_) => vec![Span::raw(strip_ansi(raw).into_owned())],
    }
}

/// One rendered line: an optional coloured prefix followed by the child's
/// text. `text` is the escape-free form, `spans` keeps the child's colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneLine {
    pub prefix: String,
    pub prefix_color: Option<PaneColor>,
    pub text: String,
    pub spans: Vec<Span<'static>>,
}

impl PaneLine {
    pub fn new(prefix: impl Into<String>, prefix_color: Option<PaneColor>, raw: &str) -> Self {
        Self {
            prefix: prefix.into(),
            prefix_color,
            text: strip_ansi(raw).into_owned(),
            spans: styled_spans(raw),
        }
    }

    pub fn plain(&self) -> String {
        format!("{}{}", self.prefix, self.text)
    }
}

/// A mutation of the display, applied by the render thread.
#[derive(Debug, Clone)]
pub enum PaneUpdate {
    Append { region: usize, line: PaneLine },
}

/// User input understood by the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneInput {
    Quit,
    FocusNext,
    ScrollUp(usize),
    ScrollDown(usize),
    Redraw,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub appearance: PanelAppearance,
    lines: VecDeque<PaneLine>,
    /// Lines scrolled back from the end; 0 = following the tail.
    scroll_back: usize,
}

impl Region {
    fn new(name: String, appearance: PanelAppearance) -> Self {
        Self {
            name,
            appearance,
            lines: VecDeque::new(),
            scroll_back: 0,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &PaneLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn scroll_back(&self) -> usize {
        self.scroll_back
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll_back = 0;
    }

    fn push(&mut self, line: PaneLine) {
        if self.lines.len() == REGION_HISTORY {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// The slice of lines visible in a viewport `height` lines tall.
    pub fn visible(&self, height: usize) -> impl Iterator<Item = &PaneLine> {
        let total = self.lines.len();
        let end = total.saturating_sub(self.scroll_back);
        let start = end.saturating_sub(height);
        self.lines.range(start..end)
    }
}

/// All regions, in grid order.
#[derive(Debug, Clone)]
pub struct PaneSet {
    regions: Vec<Region>,
    focus: usize,
}

impl PaneSet {
    pub fn new(names: &[String], styles: &HashMap<String, PanelAppearance>) -> Self {
        let regions = names
            .iter()
            .map(|name| Region::new(name.clone(), styles.get(name).copied().unwrap_or_default()))
            .collect();
        Self { regions, focus: 0 }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Apply one update, then scroll the affected region to its end.
    pub fn apply(&mut self, update: PaneUpdate) {
        match update {
            PaneUpdate::Append { region, line } => {
                if let Some(r) = self.regions.get_mut(region) {
                    r.push(line);
                    r.scroll_to_end();
                }
            }
        }
    }

    pub fn handle_input(&mut self, input: PaneInput) {
        if self.regions.is_empty() {
            return;
        }
        match input {
            PaneInput::FocusNext => self.focus = (self.focus + 1) % self.regions.len(),
            PaneInput::ScrollUp(n) => {
                let r = &mut self.regions[self.focus];
                r.scroll_back = (r.scroll_back + n).min(r.lines.len());
            }
            PaneInput::ScrollDown(n) => {
                let r = &mut self.regions[self.focus];
                r.scroll_back = r.scroll_back.saturating_sub(n);
            }
            PaneInput::Quit | PaneInput::Redraw => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> PaneLine {
        PaneLine::new("", None, text)
    }

    fn panes() -> PaneSet {
        PaneSet::new(&["procmux".to_string(), "web".to_string()], &HashMap::new())
    }

    #[test]
    fn append_scrolls_to_end() {
        let mut p = panes();
        for i in 0..10 {
            p.apply(PaneUpdate::Append { region: 1, line: line(&i.to_string()) });
        }
        p.handle_input(PaneInput::FocusNext);
        p.handle_input(PaneInput::ScrollUp(4));
        assert_eq!(p.regions()[1].scroll_back(), 4);
        let shown: Vec<_> = p.regions()[1].visible(3).map(|l| l.text.clone()).collect();
        assert_eq!(shown, vec!["3", "4", "5"]);

        p.apply(PaneUpdate::Append { region: 1, line: line("10") });
        assert_eq!(p.regions()[1].scroll_back(), 0);
        let shown: Vec<_> = p.regions()[1].visible(2).map(|l| l.text.clone()).collect();
        assert_eq!(shown, vec!["9", "10"]);
    }

    #[test]
    fn history_is_capped() {
        let mut p = panes();
        for i in 0..(REGION_HISTORY + 5) {
            p.apply(PaneUpdate::Append { region: 0, line: line(&i.to_string()) });
        }
        let r = &p.regions()[0];
        assert_eq!(r.len(), REGION_HISTORY);
        assert_eq!(r.lines().next().map(|l| l.text.as_str()), Some("5"));
    }

    #[test]
    fn out_of_range_region_is_ignored() {
        let mut p = panes();
        p.apply(PaneUpdate::Append { region: 7, line: line("lost") });
        assert!(p.regions().iter().all(Region::is_empty));
    }

    #[test]
    fn strips_colour_codes() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m plain"), "red plain");
        assert_eq!(strip_ansi("no escapes"), "no escapes");
    }

    #[test]
    fn child_colours_survive_as_spans() {
        let l = PaneLine::new("[stderr] ", Some(PaneColor::Cyan), "\x1b[31mred\x1b[0m plain");
        assert_eq!(l.text, "red plain");
        assert_eq!(l.plain(), "[stderr] red plain");
        let red = l.spans.iter().find(|s| s.content == "red").expect("red span");
        assert_eq!(red.style.fg, Some(PaneColor::Red));
        let joined: String = l.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(joined, "red plain");
    }

    #[test]
    fn plain_text_is_one_unstyled_span() {
        let l = PaneLine::new("", None, "hello");
        assert_eq!(l.spans, vec![Span::raw("hello")]);
    }
}
