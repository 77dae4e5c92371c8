use std::cell::RefCell;
use std::io::{IsTerminal, Stdout, Write};
use colored::Colorize;

const STEP_PREFIX: &str = "----->";
const INDENT: &str = "       ";

/// Structured build output.
///
/// Every message the buildpack shows to the user goes through a `Logger`, so the
/// cache code never needs to know how (or where) output is rendered.
pub trait Logger {
    /// Marks the start of a new stage, e.g. `Restoring cache`.
    fn begin_step(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warning(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Renders log lines in the classic buildpack layout:
///
/// ```text
/// -----> Restoring cache
///        Loading 3 from cacheDirectories (default):
///        - .npm
///        **WARNING** No package.json found
/// ```
///
/// Write errors are swallowed; losing a log line must never fail a build.
pub struct ConsoleLogger<W: Write> {
    out: RefCell<W>,
    color: bool,
}

impl<W: Write> ConsoleLogger<W> {
    /// Creates a logger writing uncolored output to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            color: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.borrow_mut();
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

impl ConsoleLogger<Stdout> {
    /// Logger for the process stdout, colored when attached to a terminal.
    pub fn stdout() -> Self {
        let stdout = std::io::stdout();
        let color = stdout.is_terminal();
        ConsoleLogger::new(stdout).with_color(color)
    }
}

impl ConsoleLogger<Vec<u8>> {
    /// In-memory logger, mostly useful for asserting on output.
    pub fn buffer() -> Self {
        ConsoleLogger::new(Vec::new())
    }

    /// Everything logged so far.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.out.borrow()).to_string()
    }
}

impl<W: Write> Logger for ConsoleLogger<W> {
    fn begin_step(&self, msg: &str) {
        if self.color {
            self.write_line(&format!("{} {}", STEP_PREFIX.bold(), msg));
        } else {
            self.write_line(&format!("{} {}", STEP_PREFIX, msg));
        }
    }

    fn info(&self, msg: &str) {
        self.write_line(&format!("{}{}", INDENT, msg));
    }

    fn warning(&self, msg: &str) {
        let label = "**WARNING**";
        if self.color {
            self.write_line(&format!("{}{} {}", INDENT, label.yellow().bold(), msg));
        } else {
            self.write_line(&format!("{}{} {}", INDENT, label, msg));
        }
    }

    fn error(&self, msg: &str) {
        let label = "**ERROR**";
        if self.color {
            self.write_line(&format!("{}{} {}", INDENT, label.red().bold(), msg));
        } else {
            self.write_line(&format!("{}{} {}", INDENT, label, msg));
        }
    }
}
