// src/output/multipane/surface.rs

//! Where a [`PaneSet`] is drawn.
//!
//! The render loop only needs to draw the current state and poll for input;
//! [`TerminalSurface`] does that with `ratatui` on the alternate screen.
//! Tests plug in their own surface.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::layout::{grid_dimensions, row_len};
use super::region::{PaneInput, PaneSet, Region};

/// A display that can render panes and report user input.
pub trait PaneSurface {
    fn draw(&mut self, panes: &PaneSet) -> io::Result<()>;

    /// Block up to `timeout` for the next input event.
    fn next_input(&mut self, timeout: Duration) -> io::Result<Option<PaneInput>>;
}

/// Full-screen terminal display. Restores the terminal on drop.
pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSurface {
    pub fn init() -> io::Result<Self> {
        Self::init_with(Terminal::new)
    }

    /// Enter raw mode and the alternate screen, then build the terminal with
    /// `make`. Any failure leaves the terminal as it was found.
    fn init_with<F>(make: F) -> io::Result<Self>
    where
        F: FnOnce(CrosstermBackend<Stdout>) -> io::Result<Terminal<CrosstermBackend<Stdout>>>,
    {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = stdout.execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        match make(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                restore_terminal();
                Err(e)
            }
        }
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(LeaveAlternateScreen);
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        restore_terminal();
    }
}

impl PaneSurface for TerminalSurface {
    fn draw(&mut self, panes: &PaneSet) -> io::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            for (idx, rect) in grid_rects(area, panes.regions().len()).into_iter().enumerate() {
                let region = &panes.regions()[idx];
                frame.render_widget(region_widget(region, rect, idx == panes.focus()), rect);
            }
        })?;
        Ok(())
    }

    fn next_input(&mut self, timeout: Duration) -> io::Result<Option<PaneInput>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let input = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(PaneInput::Quit)
                }
                KeyCode::Char('q') | KeyCode::Esc => Some(PaneInput::Quit),
                KeyCode::Tab => Some(PaneInput::FocusNext),
                KeyCode::Up | KeyCode::Char('k') => Some(PaneInput::ScrollUp(1)),
                KeyCode::Down | KeyCode::Char('j') => Some(PaneInput::ScrollDown(1)),
                KeyCode::PageUp => Some(PaneInput::ScrollUp(20)),
                KeyCode::PageDown => Some(PaneInput::ScrollDown(20)),
                KeyCode::End => Some(PaneInput::ScrollDown(usize::MAX)),
                _ => None,
            },
            Event::Resize(_, _) => Some(PaneInput::Redraw),
            _ => None,
        };
        Ok(input)
    }
}

/// Split `area` into a row-major grid of `total` cells. The last row's cells
/// share its full width.
fn grid_rects(area: Rect, total: usize) -> Vec<Rect> {
    let (rows, cols) = grid_dimensions(total);
    let row_areas = Layout::vertical(vec![Constraint::Ratio(1, rows as u32); rows]).split(area);

    let mut rects = Vec::with_capacity(total);
    for (row, row_area) in row_areas.iter().enumerate() {
        let n = row_len(row, total, cols);
        if n == 0 {
            continue;
        }
        let cells = Layout::horizontal(vec![Constraint::Ratio(1, n as u32); n]).split(*row_area);
        rects.extend(cells.iter().copied());
    }
    rects
}

fn region_widget(region: &Region, rect: Rect, focused: bool) -> Paragraph<'_> {
    let appearance = region.appearance;
    let mut title_style = Style::default().fg(appearance.title);
    if focused {
        title_style = title_style.add_modifier(Modifier::BOLD);
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(format!(" {} ", region.name), title_style))
        .border_style(Style::default().fg(appearance.border))
        .style(Style::default().bg(appearance.background));

    let height = rect.height.saturating_sub(2) as usize;
    let lines: Vec<Line<'_>> = region
        .visible(height)
        .map(|l| {
            let prefix_style = l
                .prefix_color
                .map(|c| Style::default().fg(c))
                .unwrap_or_default();
            let mut spans = Vec::with_capacity(l.spans.len() + 1);
            spans.push(Span::styled(l.prefix.as_str(), prefix_style));
            spans.extend(l.spans.iter().cloned());
            Line::from(spans)
        })
        .collect();

    Paragraph::new(Text::from(lines)).block(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_rects_cover_every_region() {
        let area = Rect::new(0, 0, 90, 40);
        for total in 1..=10 {
            assert_eq!(grid_rects(area, total).len(), total, "total = {total}");
        }
    }

    #[test]
    fn last_row_uses_full_width() {
        let area = Rect::new(0, 0, 90, 40);
        let rects = grid_rects(area, 5);
        // 2 rows x 3 cols; second row holds 2 wider cells.
        assert_eq!(rects[3].width + rects[4].width, 90);
        assert!(rects[3].width > rects[0].width);
    }

    #[test]
    fn failed_terminal_construction_restores_raw_mode() {
        if enable_raw_mode().is_err() {
            // No controlling terminal to observe.
            return;
        }
        let _ = disable_raw_mode();

        let result = TerminalSurface::init_with(|_| Err(io::Error::other("no size")));
        assert!(result.is_err());
        assert!(!crossterm::terminal::is_raw_mode_enabled().unwrap());
    }
}
