//! Terminal output.
//!
//! [`ConsoleReporter`] renders installer progress: section headers, a single
//! redrawn download line, and coloured status messages. `--quiet` swaps it
//! for [`bgr_core::NullReporter`].

use std::io::{IsTerminal, Write};
use std::sync::{Mutex, PoisonError};

use bgr_core::Reporter;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};

/// Reporter that writes to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    /// Last drawn percentage, so redraws only happen on change.
    last_pct: Mutex<Option<u64>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!("{} {}", "::".dark_grey(), title.bold());
    }

    fn downloading(&self, asset: &str, current: u64, total: Option<u64>) {
        let pct = total.filter(|t| *t > 0).map(|t| (current * 100 / t).min(100));
        {
            let mut last = self.last_pct.lock().unwrap_or_else(PoisonError::into_inner);
            if current > 0 && pct.is_some() && *last == pct {
                return;
            }
            *last = pct;
        }

        let line = match total {
            Some(total) => format!(
                "   {}  {}",
                asset.cyan(),
                format_download_progress(current, total)
            ),
            None => format!("   {}  {}", asset.cyan(), format_size(current).dark_grey()),
        };

        let mut stdout = std::io::stdout();
        if stdout.is_terminal() {
            let _ = queue!(stdout, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine));
            let _ = write!(stdout, "{line}");
            if pct == Some(100) {
                let _ = writeln!(stdout);
            }
            let _ = stdout.flush();
        } else if pct == Some(100) {
            println!("{line}");
        }
    }

    fn info(&self, msg: &str) {
        println!("   {msg}");
    }

    fn success(&self, msg: &str) {
        println!("{} {msg}", "✓".green());
    }

    fn warning(&self, msg: &str) {
        println!("{} {}", "!".yellow(), msg.yellow());
    }

    fn error(&self, msg: &str) {
        eprintln!("{} {}", "✗".red(), msg.red());
    }
}

/// `▓▓▓░░░  50%  1.2 MB`
pub fn format_download_progress(current: u64, total: u64) -> String {
    let pct = if total > 0 {
        (current * 100 / total).min(100)
    } else {
        0
    };
    let bar = format_progress_bar(current, total, 24);
    let size_str = format_size(total);
    format!("{bar}  {pct:>3}%  {size_str}")
}

/// Fixed-width bar using ▓ (filled) and ░ (empty).
pub fn format_progress_bar(current: u64, total: u64, width: usize) -> String {
    let filled = if total > 0 {
        (((current as f64 / total as f64) * width as f64).round() as usize).min(width)
    } else {
        0
    };
    let empty = width.saturating_sub(filled);
    format!("{}{}", "▓".repeat(filled), "░".repeat(empty))
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}
