//! Printers: coloured progress lines and markdown (termimad).

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use termimad::MadSkin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Info,
    Success,
    Warning,
    Failure,
}

/// Progress output on stdout. Colour only when stdout is a terminal.
#[derive(Debug, Clone, Copy)]
pub struct TextPrinter {
    color: bool,
}

impl Default for TextPrinter {
    fn default() -> Self {
        Self { color: std::io::stdout().is_terminal() }
    }
}

impl TextPrinter {
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn print(&self, tone: Tone, text: &str) {
        println!("{}", self.paint(tone, text));
    }

    pub fn info(&self, text: &str) {
        self.print(Tone::Info, text);
    }

    pub fn success(&self, text: &str) {
        self.print(Tone::Success, text);
    }

    pub fn warn(&self, text: &str) {
        self.print(Tone::Warning, text);
    }

    pub fn failure(&self, text: &str) {
        self.print(Tone::Failure, text);
    }

    fn paint(&self, tone: Tone, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Plain => text.to_string(),
            Tone::Info => text.cyan().to_string(),
            Tone::Success => text.green().to_string(),
            Tone::Warning => text.yellow().to_string(),
            Tone::Failure => text.red().to_string(),
        }
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}
