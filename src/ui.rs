use batchkit::BatchResult;
use codesec::Settings;
use colored::{ColoredString, Colorize};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Color a setting value by what it does
pub fn setting_value(value: &str) -> ColoredString {
    match value {
        "enabled" | "enforced" => value.green(),
        "disabled" | "unenforced" => value.red(),
        "not_set" => value.dimmed(),
        _ => value.normal(),
    }
}

/// Print every setting as an aligned key/value list
pub fn settings(settings: &Settings) {
    if settings.is_empty() {
        dim("(no settings)");
        return;
    }
    let width = settings.keys().map(String::len).max().unwrap_or(0);
    for (key, value) in settings {
        println!("  {}  {}", format!("{key:width$}").dimmed(), setting_value(value));
    }
}

/// Print the organizations a batch will touch, eliding long lists
pub fn targets(targets: &[String], limit: usize) {
    for org in targets.iter().take(limit) {
        println!("  - {}", org.green());
    }
    if targets.len() > limit {
        dim(&format!("... and {} more", targets.len() - limit));
    }
}

/// Print the final counts of a batch
pub fn summary(verb: &str, result: &BatchResult) {
    println!();
    let line = format!("{verb} complete! ({result})");
    if result.is_success() {
        println!("  {} {}", "✓".green().bold(), line.bold());
    } else {
        println!("  {} {}", "⚠".yellow().bold(), line.bold());
    }

    if result.success > 0 {
        println!("    • {} organizations succeeded", result.success);
    }
    if result.skipped > 0 {
        println!("    • {} organizations skipped", result.skipped);
    }
    if result.errors > 0 {
        println!("    • {} {} failed", result.errors, "organizations".red());
    }
}

// ============================================================================
// Tests
// ============================================================================
