//! Download progress bars

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "  {spinner:.cyan} {prefix}  {bar:24.cyan/dim} {bytes}/{total_bytes} {bytes_per_sec:.dim}  {eta:.dim}";
const SPINNER_TEMPLATE: &str = "  {spinner:.cyan} {prefix}  {bytes} {bytes_per_sec:.dim}";

/// Progress bar for an archive download.
///
/// Servers that omit `Content-Length` get a byte counter spinner instead of
/// a bar. Output goes to stderr and is hidden when stderr is not a terminal.
pub fn download_bar(expected: Option<u64>, label: &str) -> ProgressBar {
    let (bar, template) = match expected {
        Some(len) => (ProgressBar::new(len), BAR_TEMPLATE),
        None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
    };

    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .progress_chars("━╸─");
    bar.set_style(style);
    bar.set_prefix(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
