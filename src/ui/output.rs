use crate::output::is_quiet;
use crate::ui::{Icons, theme};
use owo_colors::OwoColorize;

pub fn header(icon: &str, text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", icon, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn summary_row(label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

pub fn human_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
