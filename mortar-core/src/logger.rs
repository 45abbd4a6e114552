use std::collections::HashSet;
use std::io::{self, Write};

use colored::Colorize;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use mortar_dsl::diagnostics::Location;

struct Console {
    capture: Option<Vec<u8>>,
    /// (subproject, rendered message) pairs already emitted, so repeated
    /// warnings from the same site fire once.
    seen_warnings: HashSet<(String, String)>,
    warning_counts: IndexMap<String, usize>,
}

impl Console {
    fn new() -> Self {
        Self {
            capture: None,
            seen_warnings: HashSet::new(),
            warning_counts: IndexMap::new(),
        }
    }

    fn emit(&mut self, line: &str) {
        match &mut self.capture {
            Some(buf) => {
                buf.extend_from_slice(line.as_bytes());
                buf.push(b'\n');
            }
            None => {
                let mut out = io::stdout();
                let _ = writeln!(out, "{line}");
                let _ = out.flush();
            }
        }
    }
}

static CONSOLE: Lazy<Mutex<Console>> = Lazy::new(|| Mutex::new(Console::new()));

pub fn message(text: &str) {
    CONSOLE.lock().emit(text);
}

pub fn notice(text: &str) {
    let line = format!("{} {text}", "NOTICE:".cyan());
    CONSOLE.lock().emit(&line);
}

/// Emits a warning attributed to a subproject, deduplicated per
/// (subproject, message) pair. Returns true when the warning was new.
pub fn warning(subproject: &str, location: Option<&Location>, text: &str) -> bool {
    let rendered = match location {
        Some(location) => format!("{} {text} (at {location})", "WARNING:".yellow()),
        None => format!("{} {text}", "WARNING:".yellow()),
    };

    let mut console = CONSOLE.lock();
    if !console
        .seen_warnings
        .insert((subproject.to_owned(), rendered.clone()))
    {
        return false;
    }
    *console
        .warning_counts
        .entry(subproject.to_owned())
        .or_insert(0) += 1;
    console.emit(&rendered);
    true
}

pub fn deprecation(subproject: &str, location: Option<&Location>, text: &str) -> bool {
    warning(subproject, location, &format!("DEPRECATION: {text}"))
}

pub fn warning_count(subproject: &str) -> usize {
    CONSOLE
        .lock()
        .warning_counts
        .get(subproject)
        .copied()
        .unwrap_or(0)
}

pub fn warning_counts() -> IndexMap<String, usize> {
    CONSOLE.lock().warning_counts.clone()
}

static CAPTURE_SERIAL: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Redirects console output into a buffer for the duration of the guard.
/// Tests use this to assert on emitted warnings; holding the guard also
/// serializes capturing tests against each other.
pub struct CaptureGuard {
    _serial: parking_lot::MutexGuard<'static, ()>,
}

impl CaptureGuard {
    pub fn start() -> Self {
        let serial = CAPTURE_SERIAL.lock();
        let mut console = CONSOLE.lock();
        console.capture = Some(Vec::new());
        console.seen_warnings.clear();
        console.warning_counts.clear();
        Self { _serial: serial }
    }

    pub fn take(&self) -> String {
        let mut console = CONSOLE.lock();
        let buf = console.capture.take();
        console.capture = Some(Vec::new());
        String::from_utf8_lossy(&buf.unwrap_or_default()).into_owned()
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CONSOLE.lock().capture = None;
    }
}
