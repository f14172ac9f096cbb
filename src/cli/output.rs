//! CLI output formatting utilities.

use crate::orchestrator::{QueryResponse, ToolCallRecord};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print the assistant's answer followed by the tools it used.
    pub fn answer(response: &QueryResponse) {
        println!("\n{} {}\n", style("Kart:").cyan().bold(), response.answer);

        if response.tool_calls.is_empty() {
            return;
        }

        println!("{}", style("Tools used:").dim());
        for call in &response.tool_calls {
            println!("  {}", tool_line(call));
        }
        println!();
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// `✓ route (router.project-osrm.org/route/v1/..., 183ms)`
fn tool_line(call: &ToolCallRecord) -> String {
    let mark = if call.result.is_success() {
        style("✓").green()
    } else {
        style("✗").red()
    };

    match call.result.usage() {
        Some(usage) => format!(
            "{} {} {}",
            mark,
            style(&call.tool_name).bold(),
            style(format!(
                "({}, {})",
                truncate(&usage.endpoint, 60),
                format_millis(usage.duration_ms)
            ))
            .dim()
        ),
        None => format!("{} {}", mark, style(&call.tool_name).bold()),
    }
}

fn format_millis(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.1}s", ms / 1000.0)
    } else {
        format!("{:.0}ms", ms)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
