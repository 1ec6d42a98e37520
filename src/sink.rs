// ABOUTME: Destinations for attached container output.
// ABOUTME: A colored, name-prefixed console sink and a capturing sink for tests.

use crate::runtime::LogStream;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::Write;

/// Receives output lines from attached processes.
pub trait LogSink: Send + Sync {
    fn write(&self, instance: &str, stream: LogStream, bytes: &[u8]);
}

type Paint = fn(&str) -> String;

const PALETTE: &[Paint] = &[
    |s| format!("{}", s.white()),
    |s| format!("{}", s.red()),
    |s| format!("{}", s.green()),
    |s| format!("{}", s.yellow()),
    |s| format!("{}", s.blue()),
    |s| format!("{}", s.magenta()),
    |s| format!("{}", s.cyan()),
];

/// Hands out colors in rotation, remembering each instance's first color.
#[derive(Debug, Default)]
pub struct ColorPalette {
    assigned: BTreeMap<String, usize>,
    cursor: usize,
}

impl ColorPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Palette slot for an instance, assigning the next one on first sight.
    pub fn slot(&mut self, instance: &str) -> usize {
        if let Some(&slot) = self.assigned.get(instance) {
            return slot;
        }
        let slot = self.cursor;
        self.cursor = (self.cursor + 1) % PALETTE.len();
        self.assigned.insert(instance.to_string(), slot);
        slot
    }

    fn paint(&mut self, instance: &str) -> String {
        PALETTE[self.slot(instance)](instance)
    }
}

/// Writes `<name padded> | <line>` to stdout (stderr lines to stderr).
pub struct ConsoleSink {
    palette: Mutex<ColorPalette>,
    width: usize,
    use_color: bool,
}

impl ConsoleSink {
    /// `width` is the length of the longest instance name expected.
    pub fn new(palette: ColorPalette, width: usize) -> Self {
        Self {
            palette: Mutex::new(palette),
            width,
            use_color: std::io::stdout().is_terminal(),
        }
    }

    fn format_line(&self, instance: &str, text: &str) -> String {
        let padding = " ".repeat(self.width.saturating_sub(instance.len()));
        if self.use_color {
            let name = self.palette.lock().paint(instance);
            format!("{padding}{name} {} {text}\n", "|".dimmed())
        } else {
            format!("{padding}{instance} | {text}\n")
        }
    }
}

impl LogSink for ConsoleSink {
    fn write(&self, instance: &str, stream: LogStream, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let line = self.format_line(instance, text.trim_end_matches(['\r', '\n']));
        // Write errors on a closed terminal are dropped.
        let _ = match stream {
            LogStream::Stdout => std::io::stdout().lock().write_all(line.as_bytes()),
            LogStream::Stderr => std::io::stderr().lock().write_all(line.as_bytes()),
        };
    }
}

/// One captured output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLine {
    pub instance: String,
    pub stream: LogStream,
    pub text: String,
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<CapturedLine>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines.lock().clone()
    }

    pub fn lines_for(&self, instance: &str) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|line| line.instance == instance)
            .map(|line| line.text.clone())
            .collect()
    }
}

impl LogSink for CaptureSink {
    fn write(&self, instance: &str, stream: LogStream, bytes: &[u8]) {
        self.lines.lock().push(CapturedLine {
            instance: instance.to_string(),
            stream,
            text: String::from_utf8_lossy(bytes).into_owned(),
        });
    }
}
