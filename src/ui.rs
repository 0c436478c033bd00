//! Styled terminal output for the interactive flow.
//!
//! This is user-facing progress on stdout; diagnostics go through `tracing`
//! to stderr.
use console::style;
use std::time::Duration;

const WIDTH: usize = 70;

pub fn header(text: &str) {
    let rule = "=".repeat(WIDTH);
    println!();
    println!("{}", style(&rule).blue().bold());
    println!("{}", style(format!("{text:^width$}", width = WIDTH)).blue().bold());
    println!("{}", style(&rule).blue().bold());
    println!();
}

pub fn section(text: &str) {
    let rule = "─".repeat(WIDTH);
    println!();
    println!("{}", style(&rule).cyan());
    println!("{}", style(text).cyan().bold());
    println!("{}", style(&rule).cyan());
    println!();
}

pub fn success(text: &str) {
    println!("{}", style(format!("✓ {text}")).green());
}

pub fn info(text: &str) {
    println!("{}", style(format!("ℹ {text}")).cyan());
}

pub fn warning(text: &str) {
    println!("{}", style(format!("⚠ {text}")).yellow());
}

pub fn error(text: &str) {
    eprintln!("{}", style(format!("✗ {text}")).red());
}

/// Banner with the address to hand to Laminar.
pub fn final_url(address: &str, port: u16) {
    let rule = "=".repeat(WIDTH);
    println!();
    println!("{}", style(&rule).green().bold());
    println!("{}", style("  Laminar Data Plane is ready!").green().bold());
    println!("{}", style(&rule).green().bold());
    println!();
    println!(
        "  {}  {}",
        style("Data Plane URL:").bold(),
        style(endpoint_url(address, port)).cyan()
    );
    println!();
    println!("  Copy this URL and provide it to Laminar, or point a DNS record to it.");
    println!();
    println!("{}", style(&rule).green().bold());
}

pub fn endpoint_url(address: &str, port: u16) -> String {
    format!("http://{address}:{port}")
}

/// `3m 07s` style duration for progress lines.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {:02}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formats_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(187)), "3m 07s");
        assert_eq!(format_elapsed(Duration::from_millis(900)), "0m 00s");
    }

    #[test]
    fn endpoint_url_uses_plain_http() {
        assert_eq!(
            endpoint_url("a1.elb.amazonaws.com", 40080),
            "http://a1.elb.amazonaws.com:40080"
        );
    }
}
