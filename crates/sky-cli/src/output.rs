//! Output formatting for the skyhook CLI
//!
//! Result payloads (tables, JSON documents) go to stdout; colored status
//! and diagnostic lines go to stderr so machine consumers of stdout never
//! see them.

use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use sky_core::orchestrator::StatusReport;
use sky_core::ServerDescriptor;

/// Format active servers as an ASCII table
pub fn format_servers(servers: &[ServerDescriptor]) -> String {
    if servers.is_empty() {
        return "No servers running".to_string();
    }

    #[derive(Tabled)]
    struct ServerRow {
        #[tabled(rename = "NAME")]
        key: String,
        #[tabled(rename = "HOSTNAME")]
        hostname: String,
        #[tabled(rename = "PORT")]
        port: u16,
        #[tabled(rename = "KIND")]
        kind: String,
        #[tabled(rename = "TUNNEL")]
        tunnel: String,
        #[tabled(rename = "MODE")]
        mode: String,
    }

    let rows: Vec<ServerRow> = servers
        .iter()
        .map(|s| ServerRow {
            key: s.key.clone(),
            hostname: s.hostname.clone(),
            port: s.port,
            kind: s.kind.to_string(),
            tunnel: s.tunnel.clone(),
            mode: s.mode.to_string(),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Format the full status report: tunnels first, then servers
pub fn format_status(report: &StatusReport) -> String {
    let mut output = String::new();

    if report.tunnels.is_empty() {
        output.push_str("No tunnels\n");
    } else {
        #[derive(Tabled)]
        struct TunnelRow {
            #[tabled(rename = "TUNNEL")]
            name: String,
            #[tabled(rename = "ID")]
            id: String,
            #[tabled(rename = "STATUS")]
            status: String,
            #[tabled(rename = "PID")]
            pid: String,
            #[tabled(rename = "ALIVE")]
            alive: String,
        }

        let rows: Vec<TunnelRow> = report
            .tunnels
            .iter()
            .map(|t| TunnelRow {
                name: t.name.clone(),
                id: truncate(&t.id, 14),
                status: t.status.to_string(),
                pid: t.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                alive: if t.alive { "yes" } else { "no" }.to_string(),
            })
            .collect();
        output.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        output.push('\n');
    }

    output.push('\n');

    if report.servers.is_empty() {
        output.push_str("No servers running\n");
    } else {
        #[derive(Tabled)]
        struct ServerRow {
            #[tabled(rename = "NAME")]
            key: String,
            #[tabled(rename = "HOSTNAME")]
            hostname: String,
            #[tabled(rename = "PORT")]
            port: u16,
            #[tabled(rename = "PID")]
            pid: String,
            #[tabled(rename = "ALIVE")]
            alive: String,
        }

        let rows: Vec<ServerRow> = report
            .servers
            .iter()
            .map(|s| ServerRow {
                key: s.descriptor.key.clone(),
                hostname: s.descriptor.hostname.clone(),
                port: s.descriptor.port,
                pid: s.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                alive: match s.alive {
                    Some(true) => "yes".to_string(),
                    Some(false) => "no".to_string(),
                    None => "external".to_string(),
                },
            })
            .collect();
        output.push_str(&Table::new(rows).with(Style::rounded()).to_string());
        output.push('\n');
    }

    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use sky_core::types::{ServerKind, TunnelMode};

    #[test]
    fn empty_lists_say_so() {
        assert_eq!(format_servers(&[]), "No servers running");
    }

    #[test]
    fn truncate_cuts_on_char_boundaries() {
        assert_eq!(truncate("short", 14), "short");
        assert_eq!(truncate("0123456789abcdef", 10), "0123456...");
        assert_eq!(truncate("tünnel-ßidé-äöü-ßßß", 10), "tünnel-...");
    }

    #[test]
    fn server_table_contains_hostname_and_port() {
        let servers = vec![ServerDescriptor {
            key: "demo".to_string(),
            hostname: "demo.example.com".to_string(),
            url: "https://demo.example.com".to_string(),
            port: 4000,
            kind: ServerKind::Static,
            mode: TunnelMode::Managed,
            tunnel: "skyhook".to_string(),
        }];
        let table = format_servers(&servers);
        assert!(table.contains("demo.example.com"));
        assert!(table.contains("4000"));
        assert!(table.contains("managed"));
    }
}
