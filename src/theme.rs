//! Terminal colours, status icons and the shell spinner.
//!
//! Respects the `NO_COLOR` env-var and the `--no-color` CLI flag.
//!
//! | Token          | Hex       | Usage                          |
//! |----------------|-----------|--------------------------------|
//! | accent         | `#5FAFFF` | headings, pane titles          |
//! | accent_bright  | `#87D7FF` | command names, highlights      |
//! | info           | `#AFD7FF` | informational values           |
//! | success        | `#5FD787` | running / ok states            |
//! | warn           | `#FFD75F` | warnings, critical threads     |
//! | error          | `#FF5F5F` | errors, fatal threads          |
//! | muted          | `#8A8A8A` | metadata, finished threads     |

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// ── Global color toggle ─────────────────────────────────────────────────────

static COLOR_DISABLED: AtomicBool = AtomicBool::new(false);

pub fn disable_color() {
    COLOR_DISABLED.store(true, Ordering::Relaxed);
    colored::control::set_override(false);
}

/// Initialise the colour system from `NO_COLOR` and the `--no-color` flag.
pub fn init_color(no_color_flag: bool) {
    if no_color_flag
        || std::env::var("NO_COLOR")
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    {
        disable_color();
    }
}

fn is_color() -> bool {
    !COLOR_DISABLED.load(Ordering::Relaxed)
}

// ── Palette ─────────────────────────────────────────────────────────────────

pub mod palette {
    pub const ACCENT: (u8, u8, u8) = (0x5F, 0xAF, 0xFF);
    pub const ACCENT_BRIGHT: (u8, u8, u8) = (0x87, 0xD7, 0xFF);
    pub const INFO: (u8, u8, u8) = (0xAF, 0xD7, 0xFF);
    pub const SUCCESS: (u8, u8, u8) = (0x5F, 0xD7, 0x87);
    pub const WARN: (u8, u8, u8) = (0xFF, 0xD7, 0x5F);
    pub const ERROR: (u8, u8, u8) = (0xFF, 0x5F, 0x5F);
    pub const MUTED: (u8, u8, u8) = (0x8A, 0x8A, 0x8A);
}

// ── Themed formatting helpers ───────────────────────────────────────────────

fn apply(text: &str, rgb: (u8, u8, u8)) -> String {
    if is_color() {
        text.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        text.to_string()
    }
}

fn apply_bold(text: &str, rgb: (u8, u8, u8)) -> String {
    if is_color() {
        text.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn accent(text: &str) -> String {
    apply(text, palette::ACCENT)
}

pub fn accent_bright(text: &str) -> String {
    apply(text, palette::ACCENT_BRIGHT)
}

pub fn info(text: &str) -> String {
    apply(text, palette::INFO)
}

pub fn success(text: &str) -> String {
    apply(text, palette::SUCCESS)
}

pub fn warn(text: &str) -> String {
    apply(text, palette::WARN)
}

pub fn error(text: &str) -> String {
    apply(text, palette::ERROR)
}

pub fn muted(text: &str) -> String {
    apply(text, palette::MUTED)
}

/// Bold heading in accent colour.
pub fn heading(text: &str) -> String {
    apply_bold(text, palette::ACCENT)
}

// ── Composite icons ─────────────────────────────────────────────────────────

pub fn icon_ok(label: &str) -> String {
    format!("{} {}", success("✓"), label)
}

pub fn icon_fail(label: &str) -> String {
    format!("{} {}", error("✗"), label)
}

pub fn icon_warn(label: &str) -> String {
    format!("{} {}", warn("⚠"), label)
}

// ── Spinner helpers ─────────────────────────────────────────────────────────

const SPINNER_CHARS: &[&str] = &["◒", "◐", "◓", "◑"];

/// Indeterminate spinner, used while waiting for threads to stop.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let template = if is_color() {
        "{spinner:.cyan}  {msg}"
    } else {
        "{spinner}  {msg}"
    };
    let style = ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(SPINNER_CHARS);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spinner_ok(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(icon_ok(message));
}

pub fn spinner_warn(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(icon_warn(message));
}

// ── Box drawing ─────────────────────────────────────────────────────────────

/// The framed header line(s) for `title`, padded to its display width.
pub fn header_box(title: &str) -> [String; 3] {
    use unicode_width::UnicodeWidthStr;

    let display_w = UnicodeWidthStr::width(title);
    let inner = (display_w + 4).max(42);
    let pad = inner - display_w;
    let left = pad / 2;
    let right = pad - left;
    [
        format!("┌{}┐", "─".repeat(inner)),
        format!("│{}{}{}│", " ".repeat(left), title, " ".repeat(right)),
        format!("└{}┘", "─".repeat(inner)),
    ]
}

pub fn print_header(title: &str) {
    println!();
    for line in header_box(title) {
        println!("{}", accent(&line));
    }
    println!();
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_output() {
        COLOR_DISABLED.store(true, Ordering::Relaxed);
        colored::control::set_override(false);
        assert_eq!(accent("hello"), "hello");
        assert_eq!(icon_ok("done"), "✓ done");
        assert_eq!(icon_fail("bad"), "✗ bad");
        colored::control::unset_override();
        COLOR_DISABLED.store(false, Ordering::Relaxed);
    }

    #[test]
    fn test_header_box_is_aligned() {
        use unicode_width::UnicodeWidthStr;

        let [top, middle, bottom] = header_box("Task manager");
        assert_eq!(top.width(), middle.width());
        assert_eq!(middle.width(), bottom.width());
        assert!(middle.contains("Task manager"));
    }
}

// ── Ratatui palette ─────────────────────────────────────────────────────────

#[cfg(feature = "tui")]
pub mod tui_palette {
    use ratatui::style::{Color, Modifier, Style};

    use super::palette;

    const fn rgb(c: (u8, u8, u8)) -> Color {
        Color::Rgb(c.0, c.1, c.2)
    }

    pub const ACCENT: Color = rgb(palette::ACCENT);
    pub const ACCENT_BRIGHT: Color = rgb(palette::ACCENT_BRIGHT);
    pub const INFO: Color = rgb(palette::INFO);
    pub const WARN: Color = rgb(palette::WARN);
    pub const MUTED: Color = rgb(palette::MUTED);

    pub const SURFACE: Color = Color::Rgb(0x12, 0x12, 0x12);
    pub const SURFACE_SELECTED: Color = Color::Rgb(0x28, 0x32, 0x3C);
    pub const BORDER: Color = Color::Rgb(0x3C, 0x3C, 0x3C);
    pub const TEXT: Color = Color::Rgb(0xEE, 0xEE, 0xEE);

    pub const fn focused_border() -> Style {
        Style::new().fg(ACCENT_BRIGHT)
    }

    pub const fn unfocused_border() -> Style {
        Style::new().fg(BORDER)
    }

    pub const fn title_focused() -> Style {
        Style::new().fg(ACCENT_BRIGHT).add_modifier(Modifier::BOLD)
    }

    pub const fn title_unfocused() -> Style {
        Style::new().fg(MUTED)
    }

    pub const fn header() -> Style {
        Style::new().fg(ACCENT).add_modifier(Modifier::BOLD)
    }

    pub const fn item() -> Style {
        Style::new().fg(TEXT)
    }

    /// Highlighted item in a list.
    pub const fn selected() -> Style {
        Style::new()
            .fg(TEXT)
            .bg(SURFACE_SELECTED)
            .add_modifier(Modifier::BOLD)
    }

    /// The "next page" row of a paged selection.
    pub const fn next_page() -> Style {
        Style::new().fg(INFO).add_modifier(Modifier::ITALIC)
    }

    pub const fn status() -> Style {
        Style::new().fg(WARN)
    }

    /// Key binding hints in the footer.
    pub const fn hint() -> Style {
        Style::new().fg(MUTED)
    }
}
