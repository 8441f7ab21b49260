//! Terminal styles for CLI output
//!
//! Results go to stdout and diagnostics to stderr, so each style is colored
//! only when the stream it is printed on is a terminal.

use console::Term;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    /// Section titles (stdout)
    pub heading: Style,
    /// Confirmation of a write (stdout)
    pub saved: Style,
    /// Field names in summaries (stdout)
    pub label: Style,
    pub accent: Style,
    /// Fatal errors (stderr)
    pub failure: Style,
    /// Warnings such as a missing node (stderr)
    pub caution: Style,
}

impl Theme {
    pub fn detect() -> Self {
        let stdout = Term::stdout().is_term();
        let stderr = Term::stderr().is_term();
        let on = |tty: bool, style: Style| if tty { style } else { Style::new() };

        Self {
            heading: on(stdout, Style::new().cyan().bold()),
            saved: on(stdout, Style::new().green().bold()),
            label: on(stdout, Style::new().white().dimmed()),
            accent: on(stdout, Style::new().magenta()),
            failure: on(stderr, Style::new().red().bold()),
            caution: on(stderr, Style::new().yellow().bold()),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
