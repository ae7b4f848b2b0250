// src/output/palette.rs

//! Prefix colours and panel appearances, computed once at startup.

use std::collections::HashMap;

use colored::Color;
use ratatui::style::Color as PaneColor;

/// Border/title/background colours of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelAppearance {
    pub border: PaneColor,
    pub title: PaneColor,
    pub background: PaneColor,
}

impl Default for PanelAppearance {
    fn default() -> Self {
        Self {
            border: PaneColor::Reset,
            title: PaneColor::Reset,
            background: PaneColor::Reset,
        }
    }
}

const PREFIX_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Green,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
    Color::Red,
];

// aqua, springgreen, fuchsia, yellow, dodgerblue, indianred
const PANEL_COLORS: [PaneColor; 6] = [
    PaneColor::Rgb(0x00, 0xff, 0xff),
    PaneColor::Rgb(0x00, 0xff, 0x7f),
    PaneColor::Rgb(0xff, 0x00, 0xff),
    PaneColor::Rgb(0xff, 0xff, 0x00),
    PaneColor::Rgb(0x1e, 0x90, 0xff),
    PaneColor::Rgb(0xcd, 0x5c, 0x5c),
];

/// Rotating colour assignment by command index.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(no_colors: bool) -> Self {
        Self { enabled: !no_colors }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn color_for(&self, index: usize) -> Option<Color> {
        self.enabled.then(|| PREFIX_COLORS[index % PREFIX_COLORS.len()])
    }

    /// Appearance per region name; the base region gets a neutral style unless
    /// a command already claimed its name.
    ///
    /// `noColors` only affects console prefixes, so panes are styled either way.
    pub fn panel_styles(&self, names: &[String], base_name: &str) -> HashMap<String, PanelAppearance> {
        let mut styles = HashMap::with_capacity(names.len() + 1);
        for (i, name) in names.iter().enumerate() {
            let c = PANEL_COLORS[i % PANEL_COLORS.len()];
            styles.insert(
                name.clone(),
                PanelAppearance {
                    border: c,
                    title: c,
                    background: PaneColor::Reset,
                },
            );
        }
        styles
            .entry(base_name.to_string())
            .or_insert(PanelAppearance {
                border: PaneColor::DarkGray,
                title: PaneColor::White,
                background: PaneColor::Reset,
            });
        styles
    }
}

/// Map a console colour onto the pane colour space.
pub fn pane_color(color: Color) -> PaneColor {
    match color {
        Color::Black => PaneColor::Black,
        Color::Red => PaneColor::Red,
        Color::Green => PaneColor::Green,
        Color::Yellow => PaneColor::Yellow,
        Color::Blue => PaneColor::Blue,
        Color::Magenta => PaneColor::Magenta,
        Color::Cyan => PaneColor::Cyan,
        Color::White => PaneColor::Gray,
        Color::BrightBlack => PaneColor::DarkGray,
        Color::BrightRed => PaneColor::LightRed,
        Color::BrightGreen => PaneColor::LightGreen,
        Color::BrightYellow => PaneColor::LightYellow,
        Color::BrightBlue => PaneColor::LightBlue,
        Color::BrightMagenta => PaneColor::LightMagenta,
        Color::BrightCyan => PaneColor::LightCyan,
        Color::BrightWhite => PaneColor::White,
        Color::TrueColor { r, g, b } => PaneColor::Rgb(r, g, b),
        #[allow(unreachable_patterns)]
        _ => PaneColor::Reset,
    }
}
