//! Window command for outbreak.
//!
//! Answers whether a treatment window is open at an instant and when the
//! next one opens.

use serde::Serialize;

use crate::core::{Timestamp, WindowOracle};

/// Options for the window command.
#[derive(Debug, Clone, Default)]
pub struct WindowOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the window command.
#[derive(Debug, Clone, Serialize)]
pub struct WindowOutput {
    /// Instant checked.
    pub at: Timestamp,
    /// Whether a window is open at `at`.
    pub open: bool,
    /// Start of the open window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<Timestamp>,
    /// End of the open window (inclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_end: Option<Timestamp>,
    /// Next window opening strictly after `at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_opening: Option<Timestamp>,
    /// Window length in minutes.
    pub length_minutes: i64,
}

/// The window command implementation.
pub struct WindowCommand {
    oracle: WindowOracle,
}

impl WindowCommand {
    /// Create a new window command.
    pub fn new(oracle: WindowOracle) -> Self {
        Self { oracle }
    }

    /// Check the window at `at`.
    pub fn run(&self, at: Timestamp, _options: &WindowOptions) -> WindowOutput {
        let current = self.oracle.current_window(at);
        WindowOutput {
            at,
            open: current.is_some(),
            window_start: current.map(|w| w.start),
            window_end: current.map(|w| w.end),
            next_opening: self.oracle.next_opening(at),
            length_minutes: self.oracle.length().num_minutes(),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &WindowOutput, options: &WindowOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &WindowOutput) -> String {
        let mut lines = vec![format!("At {}:", output.at.format("%Y-%m-%d %H:%M %:z"))];
        match (&output.window_start, &output.window_end) {
            (Some(start), Some(end)) => lines.push(format!(
                "  Window open ({} - {})",
                start.format("%H:%M"),
                end.format("%H:%M")
            )),
            _ => lines.push("  Window closed".to_string()),
        }
        if let Some(next) = &output.next_opening {
            lines.push(format!("  Next opening: {}", next.format("%Y-%m-%d %H:%M")));
        }
        lines.join("\n") + "\n"
    }
}
