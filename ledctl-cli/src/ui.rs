//! Console rendering

use ledctl_core::{ClientError, DashboardSnapshot, LogEntry};

const WIDE: usize = 60;
const NARROW: usize = 40;

fn rule(width: usize) -> String {
    "=".repeat(width)
}

/// Main menu with login status
pub fn menu(username: Option<&str>) -> String {
    let status = match username {
        Some(name) => format!("  Logged in as: {}", name),
        None => "  Not logged in".to_string(),
    };

    format!(
        "\n{rule}\n     CoAP LED Control Client - Main Menu\n{rule}\n{status}\n\n\
         \x20 Authentication:\n    1. Register new user\n    2. Login\n\n\
         \x20 LED Control:\n    3. Turn LED ON\n    4. Turn LED OFF\n    5. Get LED State\n\n\
         \x20 Information:\n    6. View Dashboard\n    7. View Activity Logs\n\n\
         \x20 Other:\n    8. Logout\n    9. Exit\n{rule}",
        rule = rule(50),
        status = status,
    )
}

pub fn success(message: impl std::fmt::Display) -> String {
    format!("✓ {}", message)
}

pub fn failure(message: impl std::fmt::Display) -> String {
    format!("✗ {}", message)
}

pub fn error(err: &ClientError) -> String {
    match err {
        ClientError::Unauthenticated => failure("Please login first!"),
        other => failure(other),
    }
}

/// Milliseconds rendered as seconds, without rounding
pub fn seconds(millis: u64) -> String {
    format!("{}.{:03}s", millis / 1000, millis % 1000)
}

pub fn dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut out = format!("\n{}\n          DASHBOARD\n{}\n", rule(NARROW), rule(NARROW));
    for (key, value) in snapshot.iter() {
        out.push_str(&format!("  {:<12}: {}\n", key, value));
    }
    out.push_str(&rule(NARROW));
    out
}

pub fn logs(entries: &[LogEntry]) -> String {
    let mut out = format!("\n{}\n                    ACTIVITY LOGS\n{}\n", rule(WIDE), rule(WIDE));
    if entries.is_empty() {
        out.push_str("  No logs available yet\n");
    } else {
        out.push_str(&format!("{:<15} {:<10} {:<20}\n", "User", "Action", "Timestamp"));
        out.push_str(&"-".repeat(WIDE));
        out.push('\n');
        for entry in entries {
            out.push_str(&format!(
                "{:<15} {:<10} {:<20}\n",
                entry.user,
                entry.state,
                seconds(entry.timestamp_millis)
            ));
        }
    }
    out.push_str(&rule(WIDE));
    out
}
